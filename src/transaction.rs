use std::future::Future;
use std::pin::Pin;

use libsql::Connection;
use tokio::sync::OwnedRwLockWriteGuard;

use crate::Db;

/// Errors that can occur during transaction management
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("failed to begin transaction")]
    Begin,
    #[error("failed to commit transaction")]
    Commit,
    #[error("transaction connection already released")]
    Released,
}

/// Write lock plus an open transaction on it.
///
/// Dropped before `commit`/`rollback` (the request future was cancelled), it
/// hands the lock to a task that issues the ROLLBACK, so no other caller can
/// reach the connection while the abandoned transaction is still open.
struct OpenTransaction {
    conn: Option<OwnedRwLockWriteGuard<Connection>>,
}

impl OpenTransaction {
    fn connection(&self) -> Result<&Connection, TransactionError> {
        self.conn.as_deref().ok_or(TransactionError::Released)
    }

    async fn commit(mut self) -> Result<(), TransactionError> {
        let committed = self.connection()?.execute("COMMIT", ()).await;
        let conn = self.conn.take().ok_or(TransactionError::Released)?;
        if let Err(e) = committed {
            tracing::error!(error = %e, "commit failed");
            let _ = conn.execute("ROLLBACK", ()).await;
            return Err(TransactionError::Commit);
        }
        Ok(())
    }

    async fn rollback(mut self) {
        if let Ok(conn) = self.connection() {
            if let Err(e) = conn.execute("ROLLBACK", ()).await {
                tracing::error!(error = %e, "rollback failed");
            }
        }
        self.conn.take();
    }
}

impl Drop for OpenTransaction {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        tracing::warn!("transaction dropped before commit, rolling back");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.execute("ROLLBACK", ()).await {
                        tracing::error!(error = %e, "rollback of abandoned transaction failed");
                    }
                });
            }
            Err(_) => tracing::error!("no runtime to roll back abandoned transaction"),
        }
    }
}

/// Execute a function within a database transaction, returning handler-compatible errors.
///
/// The write lock is held from BEGIN until the transaction has been committed
/// or rolled back, including when the caller's future is dropped midway.
///
/// The closure must return a boxed future to handle lifetime issues with async closures.
pub async fn with_transaction<F, T, E>(db: &Db, f: F) -> Result<T, E>
where
    F: for<'a> FnOnce(&'a Connection) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>,
    E: From<TransactionError>,
{
    let mut open = OpenTransaction {
        conn: Some(db.clone().write_owned().await),
    };

    if let Err(e) = open.connection()?.execute("BEGIN TRANSACTION", ()).await {
        tracing::error!(error = %e, "begin transaction failed");
        open.conn.take();
        return Err(TransactionError::Begin.into());
    }

    let result = f(open.connection()?).await;
    match result {
        Ok(value) => {
            open.commit().await?;
            Ok(value)
        }
        Err(e) => {
            open.rollback().await;
            Err(e)
        }
    }
}
