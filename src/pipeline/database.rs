//! Database service used by the test stage

use crate::engine::{Container, Service};

pub const MARIADB_IMAGE: &str = "mariadb:11.6";
pub const MARIADB_PORT: u16 = 3306;
/// Symfony appends `_test` to the database name when `APP_ENV=test`
pub const TEST_DATABASE: &str = "app_test";
pub const ROOT_PASSWORD: &str = "guessme";
/// Hostname the application reaches the database under
pub const DATABASE_ALIAS: &str = "db";

/// MariaDB container with the test database created on startup
pub fn mariadb_container() -> Container {
    Container::new()
        .from(MARIADB_IMAGE)
        .with_env_variable("MARIADB_DATABASE", TEST_DATABASE)
        .with_env_variable("MARIADB_ROOT_PASSWORD", ROOT_PASSWORD)
        .with_exposed_port(MARIADB_PORT)
}

pub fn mariadb_service() -> Service {
    mariadb_container().as_service(Vec::<String>::new(), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mariadb_container() {
        let container = mariadb_container();
        assert_eq!(container.base_image(), Some("mariadb:11.6"));
        assert_eq!(
            container.env(),
            vec![
                ("MARIADB_DATABASE".to_string(), "app_test".to_string()),
                ("MARIADB_ROOT_PASSWORD".to_string(), "guessme".to_string()),
            ]
        );
        assert_eq!(container.exposed_ports(), vec![3306]);
    }

    #[test]
    fn test_mariadb_service_uses_image_entrypoint() {
        let service = mariadb_service();
        assert!(service.args.is_empty());
        assert!(service.use_entrypoint);
        assert!(!service.needs_snapshot());
    }
}
