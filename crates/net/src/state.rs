use std::sync::Arc;

use lens_database::basic_db::SafeDatabase;
use lens_service::Store;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState<T> {
    pub store: Store<T>,
    pub config: Arc<Config>,
}

impl<T: SafeDatabase> AppState<T> {
    pub fn new(database: T, config: Config) -> Self {
        Self {
            store: Store::new(database).with_session_age(config.session_age_secs),
            config: Arc::new(config),
        }
    }
}
