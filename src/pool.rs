use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::encoder::{RowEncoder, RowOutcome, Segmenter};
use crate::error::Error;

/// Rows per job handed to a worker.
pub(crate) const BATCH_ROWS: usize = 500;

pub(crate) type Row = Vec<String>;
pub(crate) type Batch = Vec<Row>;

struct Job {
    seq: usize,
    rows: Batch,
}

struct Reply {
    seq: usize,
    rows: Vec<RowOutcome>,
}

/// Order-preserving parallel map. A fixed pool of workers encodes `batches`,
/// each worker owning its own encoder built once by `factory`; results reach
/// `sink` in submission order regardless of which worker finished first.
///
/// Any worker, read, or sink error aborts the whole run.
pub(crate) fn map_ordered<S, F, I, H>(
    processes: usize,
    factory: F,
    batches: I,
    mut sink: H,
) -> Result<(), Error>
where
    S: Segmenter,
    F: Fn() -> Result<RowEncoder<S>, Error> + Sync,
    I: Iterator<Item = Result<Batch, Error>>,
    H: FnMut(Vec<RowOutcome>) -> Result<(), Error>,
{
    let processes = processes.max(1);
    // The job channel capacity bounds the in-flight window, so submission
    // never blocks once the pool has gone away.
    let max_in_flight = processes * 2;

    thread::scope(|scope| {
        let (job_tx, job_rx) = mpsc::sync_channel::<Job>(max_in_flight);
        let (reply_tx, reply_rx) = mpsc::channel::<Result<Reply, Error>>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        for _ in 0..processes {
            let job_rx = Arc::clone(&job_rx);
            let reply_tx = reply_tx.clone();
            let factory = &factory;
            scope.spawn(move || worker(factory, job_rx, reply_tx));
        }
        drop(reply_tx);

        drive(job_tx, &reply_rx, max_in_flight, batches, &mut sink)
    })
}

fn worker<S, F>(factory: &F, jobs: Arc<Mutex<Receiver<Job>>>, replies: Sender<Result<Reply, Error>>)
where
    S: Segmenter,
    F: Fn() -> Result<RowEncoder<S>, Error>,
{
    let encoder = match factory() {
        Ok(encoder) => encoder,
        Err(err) => {
            let _ = replies.send(Err(err));
            return;
        }
    };

    loop {
        let job = {
            let rx = match jobs.lock() {
                Ok(rx) => rx,
                Err(_) => return,
            };
            rx.recv()
        };
        let Ok(Job { seq, rows }) = job else { return };
        let rows = rows.iter().map(|row| encoder.encode_row(row)).collect();
        if replies.send(Ok(Reply { seq, rows })).is_err() {
            return;
        }
    }
}

fn drive<I, H>(
    job_tx: SyncSender<Job>,
    reply_rx: &Receiver<Result<Reply, Error>>,
    max_in_flight: usize,
    mut batches: I,
    sink: &mut H,
) -> Result<(), Error>
where
    I: Iterator<Item = Result<Batch, Error>>,
    H: FnMut(Vec<RowOutcome>) -> Result<(), Error>,
{
    let mut next_submit = 0usize;
    let mut next_emit = 0usize;
    let mut pending: BTreeMap<usize, Vec<RowOutcome>> = BTreeMap::new();
    let mut exhausted = false;

    while !exhausted || next_emit < next_submit {
        while !exhausted && next_submit - next_emit < max_in_flight {
            match batches.next() {
                Some(rows) => {
                    let job = Job {
                        seq: next_submit,
                        rows: rows?,
                    };
                    job_tx.send(job).map_err(|_| Error::PoolDisconnected)?;
                    next_submit += 1;
                }
                None => exhausted = true,
            }
        }
        if next_emit == next_submit {
            continue;
        }

        let reply = reply_rx.recv().map_err(|_| Error::PoolDisconnected)??;
        pending.insert(reply.seq, reply.rows);
        while let Some(rows) = pending.remove(&next_emit) {
            sink(rows)?;
            next_emit += 1;
        }
    }

    // Every submitted batch has been emitted; the only thing left on the
    // reply channel is a worker whose encoder failed to build. Closing the
    // job channel lets the healthy workers hang up.
    drop(job_tx);
    while let Ok(reply) = reply_rx.recv() {
        reply?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::encoder::{testing::WordSegmenter, LenBounds, OutputFormat};

    fn factory() -> Result<RowEncoder<WordSegmenter>, Error> {
        Ok(RowEncoder::new(
            WordSegmenter::new(),
            OutputFormat::Piece,
            LenBounds::default(),
        ))
    }

    fn batches_of(rows: &[Row], size: usize) -> Vec<Result<Batch, Error>> {
        rows.chunks(size).map(|c| Ok(c.to_vec())).collect()
    }

    fn collect_columns(processes: usize, rows: &[Row], batch: usize) -> Vec<String> {
        let mut out = Vec::new();
        map_ordered(processes, factory, batches_of(rows, batch).into_iter(), |rows| {
            for row in rows {
                out.push(row.columns[0].clone().unwrap());
            }
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn output_order_matches_input_order_for_any_worker_count() {
        let rows: Vec<Row> = (0..1003).map(|i| vec![format!("tok{i} tok{i}")]).collect();
        let expected: Vec<String> = (0..1003).map(|i| format!("tok{i} tok{i}")).collect();

        assert_eq!(collect_columns(1, &rows, 7), expected);
        assert_eq!(collect_columns(12, &rows, 7), expected);
        assert_eq!(collect_columns(12, &rows, 500), expected);
    }

    #[test]
    fn empty_input_produces_no_output() {
        let out = collect_columns(4, &[], 500);
        assert!(out.is_empty());
    }

    #[test]
    fn factory_error_aborts_the_run() {
        let failing = || -> Result<RowEncoder<WordSegmenter>, Error> {
            Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no model",
            )))
        };
        let rows: Vec<Row> = (0..10).map(|i| vec![format!("tok{i}")]).collect();
        let result = map_ordered(4, failing, batches_of(&rows, 3).into_iter(), |_| Ok(()));
        assert!(result.is_err());
    }

    #[test]
    fn factory_error_aborts_even_with_empty_input() {
        // A bad model path must fail the run before the summary, whether or
        // not any rows arrive.
        let failing = || -> Result<RowEncoder<WordSegmenter>, Error> {
            Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no model",
            )))
        };
        let result = map_ordered(
            4,
            failing,
            std::iter::empty::<Result<Batch, Error>>(),
            |_| Ok(()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn read_error_aborts_the_run() {
        let batches = vec![
            Ok(vec![vec!["hello".to_string()]]),
            Err(Error::Io(io::Error::new(io::ErrorKind::Other, "boom"))),
        ];
        let result = map_ordered(2, factory, batches.into_iter(), |_| Ok(()));
        assert!(result.is_err());
    }

    #[test]
    fn sink_error_aborts_the_run() {
        let rows: Vec<Row> = (0..50).map(|i| vec![format!("tok{i}")]).collect();
        let result = map_ordered(4, factory, batches_of(&rows, 5).into_iter(), |_| {
            Err(Error::PoolDisconnected)
        });
        assert!(result.is_err());
    }
}
