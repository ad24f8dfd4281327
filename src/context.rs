//! Process-wide context handed to every handler: the loaded configuration
//! and the row-store pool. Mappers and the token authority are built fresh
//! per request from this context and live only as long as the request.

use crate::auth::authority::TokenAuthority;
use crate::config::AppConfig;
use crate::db::mapper::Mapper;
use crate::db::store::Store;
use crate::models;

pub struct AppContext {
    pub config: AppConfig,
    pub store: Store,
}

impl AppContext {
    pub fn new(config: AppConfig, store: Store) -> Self {
        Self { config, store }
    }

    pub fn authority(&self) -> TokenAuthority {
        TokenAuthority::new(
            self.config.security.jwt_secret.clone(),
            self.config.security.jwt_ttl_secs,
            self.store.clone(),
        )
    }

    pub fn users(&self) -> Mapper {
        Mapper::new(&models::user::SCHEMA, self.store.clone())
    }

    pub fn products(&self) -> Mapper {
        Mapper::new(&models::product::SCHEMA, self.store.clone())
    }

    pub fn product_types(&self) -> Mapper {
        Mapper::new(&models::product_type::SCHEMA, self.store.clone())
    }

    pub fn sales(&self) -> Mapper {
        Mapper::new(&models::sale::SCHEMA, self.store.clone())
    }
}
