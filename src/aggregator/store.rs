// =============================================================================
// Aggregation Store — per-request accumulator shared by the series tasks
// =============================================================================
//
// Writers only ever push whole records under the lock, and never hold it
// across an await point. The orchestrator reads the contents by consuming the
// store once every writer has been joined.
// =============================================================================

use parking_lot::Mutex;

use crate::types::CandleRecord;

#[derive(Debug, Default)]
pub struct AggregationStore {
    records: Mutex<Vec<CandleRecord>>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one complete record.
    pub fn append(&self, record: CandleRecord) {
        self.records.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the accumulated records. Consuming `self` means nothing can be
    /// appended after this point.
    pub fn into_records(self) -> Vec<CandleRecord> {
        self.records.into_inner()
    }

    /// Move the records out, leaving the store empty. For callers that only
    /// hold a shared reference.
    pub fn drain(&self) -> Vec<CandleRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Every field carries the writer and sequence number, so a record mixed
    /// from two writers is detectable.
    fn tagged_record(writer: usize, seq: usize) -> CandleRecord {
        let tag = format!("{writer}:{seq}");
        CandleRecord {
            symbol: format!("W{writer}USDT"),
            open_time: (writer * 1_000_000 + seq) as i64,
            open: tag.clone(),
            high: tag.clone(),
            low: tag.clone(),
            close: tag.clone(),
            volume: tag.clone(),
            close_time: (writer * 1_000_000 + seq) as i64,
            quote_asset_volume: tag.clone(),
            number_of_trades: (writer * 1_000_000 + seq) as u64,
            taker_buy_base_asset_volume: tag.clone(),
            taker_buy_quote_asset_volume: tag,
        }
    }

    #[test]
    fn append_then_consume() {
        let store = AggregationStore::new();
        assert!(store.is_empty());
        for s in 0..4 {
            store.append(tagged_record(0, s));
        }
        assert_eq!(store.len(), 4);
        assert_eq!(store.into_records().len(), 4);
    }

    #[test]
    fn drain_leaves_store_empty() {
        let store = AggregationStore::new();
        store.append(tagged_record(1, 0));
        assert_eq!(store.drain(), vec![tagged_record(1, 0)]);
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_writers_produce_no_torn_records() {
        const WRITERS: usize = 64;
        const PER_WRITER: usize = 250;

        let store = Arc::new(AggregationStore::new());
        let mut handles = Vec::with_capacity(WRITERS);
        for w in 0..WRITERS {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for s in 0..PER_WRITER {
                    store.append(tagged_record(w, s));
                    if s % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let store = Arc::try_unwrap(store).expect("all writers joined");
        let records = store.into_records();
        assert_eq!(records.len(), WRITERS * PER_WRITER);

        let mut per_writer: HashMap<String, usize> = HashMap::new();
        for r in &records {
            let (w, s) = r.open.split_once(':').unwrap();
            let (w, s): (usize, usize) = (w.parse().unwrap(), s.parse().unwrap());
            assert_eq!(r, &tagged_record(w, s));
            *per_writer.entry(r.symbol.clone()).or_default() += 1;
        }
        assert_eq!(per_writer.len(), WRITERS);
        assert!(per_writer.values().all(|&n| n == PER_WRITER));
    }
}
