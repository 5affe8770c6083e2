use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::runtime::Handle;
use work_queue::{
    Request, RequestHandler, Response, ResponseHandler, WorkQueue, WorkQueueConfig,
    MAX_USER_CHANNEL,
};

const CHANNEL: u16 = MAX_USER_CHANNEL + 7;

/// Echoes the payload back, optionally sleeping first, and reports the worker thread.
struct Echo;

impl RequestHandler<(u32, u64), (u32, ThreadId)> for Echo {
    fn handle_request(&self, request: Request<(u32, u64)>) -> Response<(u32, ThreadId)> {
        let (value, sleep_ms) = request.data;
        if sleep_ms > 0 {
            thread::sleep(Duration::from_millis(sleep_ms));
        }
        if value == 666 {
            panic!("cursed value");
        }
        Response::success(request.header, (value, thread::current().id()))
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(u32, ThreadId, ThreadId)>>,
}

impl ResponseHandler<(u32, ThreadId)> for Recorder {
    fn handle_response(&self, response: Response<(u32, ThreadId)>) {
        let (value, worker) = response.data;
        self.seen
            .lock()
            .unwrap()
            .push((value, worker, thread::current().id()));
    }
}

fn start(
    config: WorkQueueConfig,
) -> (
    WorkQueue<(u32, u64), (u32, ThreadId)>,
    work_queue::ResponsePump<(u32, ThreadId)>,
    Arc<Recorder>,
) {
    let (queue, pump) = WorkQueue::new(Handle::current(), &config);
    let recorder = Arc::new(Recorder::default());
    queue.add_request_handler(CHANNEL, Arc::new(Echo));
    queue.add_response_handler(CHANNEL, recorder.clone());
    (queue, pump, recorder)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_requests_run_off_thread_and_responses_on_pump_thread() {
    let (queue, mut pump, recorder) = start(WorkQueueConfig::default());
    let pump_thread = thread::current().id();

    for value in 0..8 {
        queue.add_request(CHANNEL, 0, (value, 0)).unwrap();
    }
    for _ in 0..8 {
        assert!(pump.process_next().await);
    }

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 8);
    for (_, worker, delivered_on) in seen.iter() {
        assert_ne!(*worker, pump_thread);
        assert_eq!(*delivered_on, pump_thread);
    }
    let mut values: Vec<u32> = seen.iter().map(|(v, _, _)| *v).collect();
    values.sort();
    assert_eq!(values, (0..8).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_worker_completes_in_submission_order() {
    let (queue, mut pump, recorder) = start(WorkQueueConfig::default().with_worker_threads(1));

    queue.add_request(CHANNEL, 0, (1, 30)).unwrap();
    queue.add_request(CHANNEL, 0, (2, 0)).unwrap();
    queue.add_request(CHANNEL, 0, (3, 0)).unwrap();
    for _ in 0..3 {
        pump.process_next().await;
    }

    let order: Vec<u32> = recorder.seen.lock().unwrap().iter().map(|(v, _, _)| *v).collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_process_responses_never_blocks() {
    let (queue, mut pump, recorder) = start(WorkQueueConfig::default());

    queue.add_request(CHANNEL, 0, (1, 200)).unwrap();
    assert_eq!(pump.process_responses(), 0);
    assert_eq!(pump.pending(), 1);

    while pump.pending() > 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        pump.process_responses();
    }
    assert_eq!(recorder.seen.lock().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panicking_handler_produces_no_response() {
    let (queue, mut pump, recorder) = start(WorkQueueConfig::default());

    queue.add_request(CHANNEL, 0, (666, 0)).unwrap();
    queue.add_request(CHANNEL, 0, (5, 50)).unwrap();
    assert!(pump.process_next().await);

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, 5);
    assert_eq!(pump.pending(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_response_without_handler_is_dropped() {
    let (queue, mut pump, recorder) = start(WorkQueueConfig::default());
    queue.remove_response_handler(CHANNEL);

    queue.add_request(CHANNEL, 0, (1, 0)).unwrap();
    assert!(pump.process_next().await);
    assert!(recorder.seen.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pump_finishes_once_queue_is_dropped() {
    let (queue, mut pump, recorder) = start(WorkQueueConfig::default());
    queue.add_request(CHANNEL, 0, (1, 10)).unwrap();
    drop(queue);

    assert!(pump.process_next().await);
    assert!(!pump.process_next().await);
    assert_eq!(recorder.seen.lock().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_waiting_pump_wakes_when_last_request_panics() {
    let (queue, mut pump, recorder) = start(WorkQueueConfig::default());
    queue.add_request(CHANNEL, 0, (666, 50)).unwrap();

    let woke = tokio::time::timeout(Duration::from_secs(3), pump.process_next())
        .await
        .expect("Pump stayed asleep after the request was lost");
    assert!(!woke);
    assert_eq!(pump.pending(), 0);
    assert!(recorder.seen.lock().unwrap().is_empty());
    drop(queue);
}
