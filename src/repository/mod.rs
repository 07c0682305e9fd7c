//! Repository layer for database operations
//!
//! Read methods query the pool directly. Write methods take a
//! `&mut PgConnection` so that a service can run several of them, plus the
//! activity row, inside one [`UnitOfWork`].

pub mod activity_logs;
pub mod books;
pub mod borrowings;
pub mod categories;
pub mod users;

use sqlx::{PgConnection, Pool, Postgres, Transaction};

use crate::{error::AppResult, models::NewActivity};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub categories: categories::CategoriesRepository,
    pub books: books::BooksRepository,
    pub borrowings: borrowings::BorrowingsRepository,
    pub activity_logs: activity_logs::ActivityLogsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            borrowings: borrowings::BorrowingsRepository::new(pool.clone()),
            activity_logs: activity_logs::ActivityLogsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Start a unit of work on a fresh transaction
    pub async fn begin(&self) -> AppResult<UnitOfWork> {
        Ok(UnitOfWork {
            tx: self.pool.begin().await?,
        })
    }

    /// Database round trip used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One database transaction shared by the repository calls of a command.
///
/// Dropping it without [`UnitOfWork::commit`] rolls everything back.
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork {
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Append an activity row to this transaction
    pub async fn log(&mut self, activity: NewActivity) -> AppResult<()> {
        activity_logs::ActivityLogsRepository::insert(&mut self.tx, &activity).await
    }

    pub async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
