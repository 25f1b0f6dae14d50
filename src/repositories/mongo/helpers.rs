use mongodb::bson::{doc, Bson, Document};
use mongodb::error::Result as MongoResult;
use mongodb::options::{Acknowledgment, ReadConcern, TransactionOptions, WriteConcern};
use mongodb::{Client, ClientSession, Collection, Database};
use tracing::Instrument;

use super::converters::{convert_404_or, convert_repo_err, to_bool};
use super::{RepositoryError, Result as RepoResult};
use crate::utils::LetChain;

pub async fn initialize_coll(coll_name: &str, key: &str, db: &Database) -> MongoResult<()> {
    db.run_command(
        doc! {
            "createIndexes": coll_name,
            "indexes": [{
                "name": format!("unique_{}", key),
                "key": {
                    key: 1
                },
                "unique": true
            }],
        },
        None,
    )
    .instrument(tracing::trace_span!("run_command", coll = coll_name))
    .await?;

    Ok(())
}

pub async fn make_session(c: &Client) -> MongoResult<ClientSession> {
    let mut s = c
        .start_session(None)
        .instrument(tracing::trace_span!("start_session"))
        .await?;

    let ta_opt = TransactionOptions::builder()
        .read_concern(ReadConcern::snapshot())
        .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
        .build();
    s.start_transaction(ta_opt)
        .instrument(tracing::trace_span!("start_transaction"))
        .await?;

    Ok(s)
}

pub async fn process_transaction(s: &mut ClientSession) -> MongoResult<()> {
    loop {
        let r = s
            .commit_transaction()
            .instrument(tracing::trace_span!("commit_transaction"))
            .await;
        if let Err(ref e) = r {
            if e.contains_label(::mongodb::error::UNKNOWN_TRANSACTION_COMMIT_RESULT) {
                continue;
            }
        }

        break r;
    }
}

/// aborts and hands the domain error back; the caller must not retry it.
pub async fn abort_with<T>(
    s: &mut ClientSession,
    e: RepositoryError,
) -> MongoResult<RepoResult<T>> {
    s.abort_transaction()
        .instrument(tracing::trace_span!("abort_transaction"))
        .await?;

    Ok(Err(e))
}

/// reruns `f` while the server labels the failure as transient.
pub async fn exec_transaction<F, Fut, R>(mut f: F) -> MongoResult<R>
where
    F: FnMut() -> Fut,
    Fut: ::core::future::Future<Output = MongoResult<R>>,
{
    loop {
        let r = f().await;
        if let Err(ref e) = r {
            if e.contains_label(::mongodb::error::TRANSIENT_TRANSACTION_ERROR) {
                tracing::debug!("retrying transient transaction: {}", e);
                continue;
            }
        }

        break r;
    }
}

pub async fn get_one<T>(coll: &Collection<T>, filter: Document) -> RepoResult<T>
where T: Sync + Send + Unpin + ::serde::de::DeserializeOwned {
    let res = coll
        .find_one(filter, None)
        .instrument(tracing::trace_span!("find_one"))
        .await
        .let_(convert_repo_err)?
        .let_(convert_404_or)?;

    Ok(res)
}

pub async fn count_one<T>(coll: &Collection<T>, filter: Document) -> RepoResult<bool> {
    let res = coll
        .count_documents(filter, None)
        .instrument(tracing::trace_span!("count_documents"))
        .await
        .let_(convert_repo_err)?
        .let_(to_bool);

    Ok(res)
}

pub async fn is_contains<T>(
    name: &str,
    coll: &Collection<T>,
    id: impl Into<Bson>,
    target: impl Into<Bson>,
) -> RepoResult<bool> {
    let id = id.into();
    let res = coll
        .count_documents(
            doc! {
                "id": &id,
                name: { "$in": [target.into()] }
            },
            None,
        )
        .instrument(tracing::trace_span!("count_documents", field = name))
        .await
        .let_(convert_repo_err)?
        .let_(to_bool);

    if !res && !count_one(coll, doc! { "id": id }).await? {
        return Err(RepositoryError::NotFound);
    }

    Ok(res)
}

#[derive(Debug, Clone, Copy)]
pub enum ModifyOpTy {
    Push,
    Pull,
}

/// set membership and its `<name>_size` counter move in one conditional update.
pub async fn modify_set<T>(
    name: &str,
    coll: &Collection<T>,
    id: impl Into<Bson>,
    target: impl Into<Bson>,
    ty: ModifyOpTy,
) -> RepoResult<bool> {
    let id = id.into();
    let target = target.into();
    let inc_name = format!("{}_size", name);

    let (filter, update) = match ty {
        ModifyOpTy::Push => (
            doc! { "id": &id, name: { "$ne": &target } },
            doc! {
                "$addToSet": { name: &target },
                "$inc": { &inc_name: 1 }
            },
        ),
        ModifyOpTy::Pull => (
            doc! { "id": &id, name: &target },
            doc! {
                "$pull": { name: &target },
                "$inc": { &inc_name: -1 }
            },
        ),
    };

    let res = coll
        .update_one(filter, update, None)
        .instrument(tracing::trace_span!("update_one", field = name, op = ?ty))
        .await
        .let_(convert_repo_err)?;

    if res.modified_count.let_(to_bool) {
        return Ok(true);
    }

    match count_one(coll, doc! { "id": id }).await? {
        true => Ok(false),
        false => Err(RepositoryError::NotFound),
    }
}
