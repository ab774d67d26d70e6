use std::thread;
use tokio::sync::{mpsc, oneshot};
use anyhow::Result;
use crate::cache::db::KvDb;

/// Commands sent to the store thread
pub enum StoreCommand {
    Get(String, oneshot::Sender<Result<Option<String>>>),
    Put(String, String, oneshot::Sender<Result<()>>),
    Delete(String, oneshot::Sender<Result<bool>>),
    Shutdown,
}

/// Handle to the store thread. The SQLite connection never leaves that thread.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn spawn(db: KvDb) -> Self {
        let (tx, mut rx) = mpsc::channel::<StoreCommand>(64);

        thread::spawn(move || {
            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    StoreCommand::Get(key, reply) => {
                        let _ = reply.send(db.get(&key));
                    }
                    StoreCommand::Put(key, value, reply) => {
                        let _ = reply.send(db.put(&key, &value));
                    }
                    StoreCommand::Delete(key, reply) => {
                        let _ = reply.send(db.delete(&key));
                    }
                    StoreCommand::Shutdown => {
                        tracing::info!("Store thread shutting down");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Get(key.to_string(), reply)).await?;
        rx.await?
    }

    pub async fn put(&self, key: &str, value: String) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Put(key.to_string(), value, reply)).await?;
        rx.await?
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Delete(key.to_string(), reply)).await?;
        rx.await?
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(StoreCommand::Shutdown).await?;
        Ok(())
    }
}
