use anyhow::Context;

/// Database connection settings, taken from the `RP_DB_*` environment.
///
/// Every key is mandatory: a missing variable is a fatal configuration error
/// reported by clap before the process does any work.
#[derive(clap::Args)]
pub struct DatabaseArgs {
    #[clap(long = "db-user", env = "RP_DB_USER", hide_env_values = true)]
    pub user: String,

    #[clap(long = "db-password", env = "RP_DB_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[clap(long = "db-host", env = "RP_DB_HOST")]
    pub host: String,

    #[clap(long = "db-port", env = "RP_DB_PORT")]
    pub port: u16,

    #[clap(long = "db-database", env = "RP_DB_DATABASE")]
    pub database: String,
}

// Hand-written so credentials never land in startup logs.
impl std::fmt::Debug for DatabaseArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseArgs")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl DatabaseArgs {
    /// Connects a pool with a bounded acquire timeout, identifying the
    /// process to postgres by `application_name`.
    pub async fn connect(&self, application_name: &str) -> anyhow::Result<sqlx::PgPool> {
        let options = sqlx::postgres::PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .application_name(application_name);

        sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect_with(options)
            .await
            .context("connecting to database")
    }
}
