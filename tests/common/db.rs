//! Managing test databases.

use diesel::{Connection, connection::SimpleConnection, pg::PgConnection};
use diesel_migrations::{find_migrations_directory, run_pending_migrations_in_directory};
use docflow::db::{Pool, PgStore};
use failure::{Error, err_msg};
use r2d2_diesel::ConnectionManager;
use std::sync::Mutex;

pub struct Database {
    lock: Mutex<()>,
    pool: Pool,
    seed: Box<dyn Fn(&PgConnection) -> Result<(), Error> + Send + Sync>,
}

impl Database {
    /// Obtain an exclusive lock to the test database.
    ///
    /// The database is cleared and re-seeded before `f` runs.
    pub fn lock<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(PgStore, &PgConnection) -> Result<R, Error>,
    {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        let conn = self.pool.get()?;
        conn.batch_execute(CLEAR_DATABASE)?;
        (self.seed)(&conn)?;

        f(PgStore::new(self.pool.clone()), &conn)
    }
}

/// Set up a database for testing, or return `None` when `DATABASE_URL` is not
/// set.
///
/// The database named in `DATABASE_URL` is dropped and re-created, and all
/// migrations are applied to it. Set `TEST_DONT_CREATE_DATABASE` to use it
/// as is instead.
pub fn setup_db<F>(seed: F) -> Result<Option<Database>, Error>
where
    F: Fn(&PgConnection) -> Result<(), Error> + Send + Sync + 'static,
{
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };
    let create = std::env::var_os("TEST_DONT_CREATE_DATABASE").is_none();

    if create {
        eprintln!("Re-creating database. Set TEST_DONT_CREATE_DATABASE to skip");
        let (database, default_url) = change_database_of_url(&url)?;
        let conn = PgConnection::establish(&default_url)?;
        conn.batch_execute(&format!("DROP DATABASE IF EXISTS {}", quote(&database)))?;
        conn.batch_execute(&format!("CREATE DATABASE {}", quote(&database)))?;
    }

    let conn = PgConnection::establish(&url)?;

    if create {
        let migrations = find_migrations_directory()?;
        run_pending_migrations_in_directory(&conn, &migrations, &mut std::io::stderr())?;
    }

    Ok(Some(Database {
        lock: Mutex::new(()),
        pool: Pool::new(ConnectionManager::new(url))?,
        seed: Box::new(seed),
    }))
}

/// Change connection URL to point to the default database. Return name of the
/// original database and the new URL.
fn change_database_of_url(url: &str) -> Result<(String, String), Error> {
    let base = url::Url::parse(url)?;
    let database = base.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| err_msg("DATABASE_URL must name a database"))?
        .to_string();
    let mut new_url = base.join("postgres")?;
    new_url.set_query(base.query());
    Ok((database, new_url.into_string()))
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

const CLEAR_DATABASE: &str = r#"
do $$
declare
    stmt text;
begin
    select 'TRUNCATE '
        || string_agg(format('%I.%I', schemaname, tablename), ', ')
    into stmt
    from pg_tables
    where schemaname = 'public'
      and tablename not like '__diesel_%';

    execute stmt;

    for stmt in (
        select 'alter sequence ' || relname || ' restart with 1;'
        from pg_class
        where relkind = 'S'
    ) loop
        execute stmt;
    end loop;
end; $$
"#;
