//! MongoDB store
//!
//! Production `Store` backend. Batches run inside a causally-consistent
//! session transaction; `GuardNotArchived` re-reads the topic within the
//! session so the "still not archived" check commits atomically with the
//! writes. Counter deltas map to `$inc` and participant unions to
//! `$addToSet`, never read-modify-write.
//!
//! Multi-document transactions require a replica set; standalone dev
//! deployments should run with `--dev-mode` and the in-memory store.

use bson::{doc, Bson, Document};
use futures_util::StreamExt;
use mongodb::{Client, ClientSession, Collection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::batch::{WriteBatch, WriteOp};
use crate::db::schemas::{
    ledger_key, CommentDoc, JustificationDoc, ProposalDoc, ReVoteMarker, RuntimeConfig, TopicDoc,
    VoteEntry, COMMENT_COLLECTION, CONFIG_COLLECTION, CONFIG_DOC_ID, JUSTIFICATION_COLLECTION,
    MARKER_COLLECTION, PROPOSAL_COLLECTION, TOPIC_COLLECTION, VOTE_COLLECTION,
};
use crate::db::store::Store;
use crate::types::{AgoraError, Result};
use async_trait::async_trait;

pub struct MongoStore {
    client: Client,
    db_name: String,
}

impl MongoStore {
    /// Connect and ping; fails fast when the deployment is unreachable.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }).await?;

        let store = Self { client, db_name: db_name.to_string() };
        store.ensure_indexes().await;
        info!(db = %db_name, "MongoDB store ready");
        Ok(store)
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.client.database(&self.db_name).collection(name)
    }

    async fn ensure_indexes(&self) {
        let indexes: [(&str, Document); 5] = [
            (TOPIC_COLLECTION, doc! { "status": 1 }),
            (VOTE_COLLECTION, doc! { "topic_id": 1 }),
            (COMMENT_COLLECTION, doc! { "topic_id": 1 }),
            (JUSTIFICATION_COLLECTION, doc! { "topic_id": 1 }),
            (PROPOSAL_COLLECTION, doc! { "created_at": 1 }),
        ];

        for (name, keys) in indexes {
            let index = mongodb::IndexModel::builder().keys(keys).build();
            let coll = self.collection::<Document>(name);
            if let Err(e) = coll.create_index(index).await {
                warn!(collection = name, "Failed to create index: {}", e);
            }
        }
    }

    /// Drain a cursor, skipping records that fail (closed-enum) decoding.
    async fn drain<T: DeserializeOwned + Send + Sync>(
        &self,
        name: &str,
        filter: Document,
    ) -> Result<Vec<T>> {
        let cursor = self.collection::<T>(name).find(filter).await?;
        let results: Vec<T> = cursor
            .filter_map(|item| async {
                match item {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        warn!(collection = name, "Skipping malformed document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;
        Ok(results)
    }

    async fn upsert<T: Serialize + Send + Sync>(
        &self,
        session: &mut ClientSession,
        name: &str,
        id: &str,
        value: &T,
    ) -> Result<()> {
        self.collection::<T>(name)
            .replace_one(doc! { "_id": id }, value)
            .upsert(true)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    async fn apply_op(&self, session: &mut ClientSession, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::GuardNotArchived { topic_id } => {
                let topic = self
                    .collection::<TopicDoc>(TOPIC_COLLECTION)
                    .find_one(doc! { "_id": topic_id })
                    .session(&mut *session)
                    .await?
                    .ok_or_else(|| {
                        AgoraError::PreconditionFailed(format!("topic {} does not exist", topic_id))
                    })?;
                if topic.is_archived() {
                    return Err(AgoraError::PreconditionFailed(format!(
                        "topic {} is already archived",
                        topic_id
                    )));
                }
            }

            WriteOp::PutTopic(topic) => {
                self.upsert(session, TOPIC_COLLECTION, &topic.id, topic).await?;
            }

            WriteOp::PutVote(entry) => {
                self.upsert(session, VOTE_COLLECTION, &entry.id, entry).await?;
            }
            WriteOp::DeleteVotes { topic_id } => {
                self.collection::<VoteEntry>(VOTE_COLLECTION)
                    .delete_many(doc! { "topic_id": topic_id })
                    .session(&mut *session)
                    .await?;
            }
            WriteOp::PutMarker(marker) => {
                self.upsert(session, MARKER_COLLECTION, &marker.id, marker).await?;
            }

            WriteOp::PutComment(comment) => {
                self.upsert(session, COMMENT_COLLECTION, &comment.id, comment).await?;
            }
            WriteOp::DeleteComment { topic_id, comment_id } => {
                self.collection::<CommentDoc>(COMMENT_COLLECTION)
                    .delete_one(doc! { "_id": comment_id, "topic_id": topic_id })
                    .session(&mut *session)
                    .await?;
            }
            WriteOp::PutJustification(post) => {
                self.upsert(session, JUSTIFICATION_COLLECTION, &post.id, post).await?;
            }
            WriteOp::DeleteJustification { topic_id, justification_id } => {
                self.collection::<JustificationDoc>(JUSTIFICATION_COLLECTION)
                    .delete_one(doc! { "_id": justification_id, "topic_id": topic_id })
                    .session(&mut *session)
                    .await?;
            }

            WriteOp::AdjustTally { topic_id, deltas } => {
                let mut inc = Document::new();
                for (option_id, delta) in deltas {
                    inc.insert(format!("tally.{}", option_id), *delta);
                }
                let result = self
                    .collection::<TopicDoc>(TOPIC_COLLECTION)
                    .update_one(doc! { "_id": topic_id }, doc! { "$inc": inc })
                    .session(&mut *session)
                    .await?;
                if result.matched_count == 0 {
                    return Err(AgoraError::Database(format!("no such topic: {}", topic_id)));
                }
            }
            WriteOp::AddParticipant { topic_id, voter_id } => {
                let result = self
                    .collection::<TopicDoc>(TOPIC_COLLECTION)
                    .update_one(
                        doc! { "_id": topic_id },
                        doc! { "$addToSet": { "voters": voter_id } },
                    )
                    .session(&mut *session)
                    .await?;
                if result.matched_count == 0 {
                    return Err(AgoraError::Database(format!("no such topic: {}", topic_id)));
                }
            }
            WriteOp::AdjustLikes { topic_id, delta } => {
                let result = self
                    .collection::<TopicDoc>(TOPIC_COLLECTION)
                    .update_one(
                        doc! { "_id": topic_id },
                        doc! { "$inc": { "likes": *delta } },
                    )
                    .session(&mut *session)
                    .await?;
                if result.matched_count == 0 {
                    return Err(AgoraError::Database(format!("no such topic: {}", topic_id)));
                }
            }
            WriteOp::BumpComment { topic_id, comment_id, likes, reports } => {
                let result = self
                    .collection::<CommentDoc>(COMMENT_COLLECTION)
                    .update_one(
                        doc! { "_id": comment_id, "topic_id": topic_id },
                        doc! { "$inc": { "likes": *likes, "reports": *reports } },
                    )
                    .session(&mut *session)
                    .await?;
                if result.matched_count == 0 {
                    return Err(AgoraError::Database(format!("no such comment: {}", comment_id)));
                }
            }

            WriteOp::PutProposal(proposal) => {
                self.upsert(session, PROPOSAL_COLLECTION, &proposal.id, proposal).await?;
            }
            WriteOp::VoteProposal { proposal_id, voter_id } => {
                // Set-guarded increment: matches only while the voter is
                // absent from voter_ids, so repeats are no-ops.
                let result = self
                    .collection::<ProposalDoc>(PROPOSAL_COLLECTION)
                    .update_one(
                        doc! { "_id": proposal_id, "voter_ids": { "$ne": voter_id } },
                        doc! { "$inc": { "votes": 1 }, "$addToSet": { "voter_ids": voter_id } },
                    )
                    .session(&mut *session)
                    .await?;
                if result.matched_count == 0 {
                    let exists = self
                        .collection::<ProposalDoc>(PROPOSAL_COLLECTION)
                        .find_one(doc! { "_id": proposal_id })
                        .session(&mut *session)
                        .await?
                        .is_some();
                    if !exists {
                        return Err(AgoraError::Database(format!(
                            "no such proposal: {}",
                            proposal_id
                        )));
                    }
                }
            }
            WriteOp::DeleteProposals => {
                self.collection::<ProposalDoc>(PROPOSAL_COLLECTION)
                    .delete_many(doc! {})
                    .session(&mut *session)
                    .await?;
            }

            WriteOp::SetPhaseOverride(phase) => {
                let update = match phase {
                    Some(p) => doc! { "$set": { "phase_override": p.as_str() } },
                    None => doc! { "$unset": { "phase_override": Bson::Int32(1) } },
                };
                self.collection::<RuntimeConfig>(CONFIG_COLLECTION)
                    .update_one(doc! { "_id": CONFIG_DOC_ID }, update)
                    .upsert(true)
                    .session(&mut *session)
                    .await?;
            }
            WriteOp::SetProposalWatermark(at) => {
                let ts = bson::to_bson(at)
                    .map_err(|e| AgoraError::Internal(format!("timestamp encode: {}", e)))?;
                self.collection::<RuntimeConfig>(CONFIG_COLLECTION)
                    .update_one(
                        doc! { "_id": CONFIG_DOC_ID },
                        doc! { "$set": { "last_proposal_clear": ts } },
                    )
                    .upsert(true)
                    .session(&mut *session)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn topic(&self, topic_id: &str) -> Result<Option<TopicDoc>> {
        Ok(self
            .collection::<TopicDoc>(TOPIC_COLLECTION)
            .find_one(doc! { "_id": topic_id })
            .await?)
    }

    async fn published_topics(&self) -> Result<Vec<TopicDoc>> {
        self.drain(TOPIC_COLLECTION, doc! { "status": "published" }).await
    }

    async fn vote(&self, topic_id: &str, voter_id: &str) -> Result<Option<VoteEntry>> {
        Ok(self
            .collection::<VoteEntry>(VOTE_COLLECTION)
            .find_one(doc! { "_id": ledger_key(topic_id, voter_id) })
            .await?)
    }

    async fn votes(&self, topic_id: &str) -> Result<Vec<VoteEntry>> {
        self.drain(VOTE_COLLECTION, doc! { "topic_id": topic_id }).await
    }

    async fn marker(&self, topic_id: &str, voter_id: &str) -> Result<Option<ReVoteMarker>> {
        Ok(self
            .collection::<ReVoteMarker>(MARKER_COLLECTION)
            .find_one(doc! { "_id": ledger_key(topic_id, voter_id) })
            .await?)
    }

    async fn comments(&self, topic_id: &str) -> Result<Vec<CommentDoc>> {
        self.drain(COMMENT_COLLECTION, doc! { "topic_id": topic_id }).await
    }

    async fn justifications(&self, topic_id: &str) -> Result<Vec<JustificationDoc>> {
        self.drain(JUSTIFICATION_COLLECTION, doc! { "topic_id": topic_id }).await
    }

    async fn proposals(&self) -> Result<Vec<ProposalDoc>> {
        self.drain(PROPOSAL_COLLECTION, doc! {}).await
    }

    async fn runtime_config(&self) -> Result<RuntimeConfig> {
        Ok(self
            .collection::<RuntimeConfig>(CONFIG_COLLECTION)
            .find_one(doc! { "_id": CONFIG_DOC_ID })
            .await?
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        for op in batch.ops() {
            if let Err(e) = self.apply_op(&mut session, op).await {
                let _ = session.abort_transaction().await;
                return Err(e);
            }
        }

        session
            .commit_transaction()
            .await
            .map_err(|e| AgoraError::BatchCommitFailed(e.to_string()))?;
        debug!(ops = batch.len(), "Batch committed");
        Ok(())
    }
}
