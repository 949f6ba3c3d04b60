use async_trait::async_trait;
use redis::AsyncCommands;
use redis::streams::StreamRangeReply;

use super::RedisCache;
use crate::queue::{JobClass, JobId, JobQueue, JobRecord, QueueEntry};
use crate::store::Result;

/// Job logs are Redis streams: XADD to append, XRANGE - + to replay, XDEL to remove.
#[async_trait]
impl JobQueue for RedisCache {
    async fn append(&self, class: JobClass, record: &JobRecord) -> Result<JobId> {
        let mut conn = self.conn.clone();
        let items: Vec<(&str, &str)> = record
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let id: String = conn.xadd(class.log_name(), "*", items.as_slice()).await?;
        Ok(JobId(id))
    }

    async fn range_all(&self, class: JobClass) -> Result<Vec<QueueEntry>> {
        let mut conn = self.conn.clone();
        let reply: StreamRangeReply = conn.xrange_all(class.log_name()).await?;

        let entries = reply
            .ids
            .into_iter()
            .map(|entry| {
                let record: JobRecord = entry
                    .map
                    .iter()
                    .filter_map(|(field, value)| {
                        redis::from_redis_value::<String>(value)
                            .ok()
                            .map(|v| (field.clone(), v))
                    })
                    .collect();
                QueueEntry {
                    id: JobId(entry.id),
                    record,
                }
            })
            .collect();

        Ok(entries)
    }

    async fn delete(&self, class: JobClass, id: &JobId) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: usize = conn.xdel(class.log_name(), &[id.0.as_str()]).await?;
        Ok(())
    }
}
