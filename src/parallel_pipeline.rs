// THEORY:
// Scans are CPU-bound loops that can take a noticeable time on a full-size phone
// photo. Running them directly on the async request handlers would let a burst of
// uploads starve every other request, so the service hands them to a `ScanPool`:
//
// - a bounded task queue in front (submitters wait when it is full),
// - a fixed set of workers that all pull from that one queue,
// - each worker running one scan at a time on tokio's blocking thread pool.
//
// A worker only takes a task when it is idle, so one large image never holds back
// small ones while another worker has nothing to do. At most `worker_count` scans run
// at once. Scans never share state, so results come back in whatever order they
// finish; each caller awaits its own oneshot reply. Every task can carry a
// `CancelFlag` that the scanner checks between rows.
//
// `ScanPool::new` spawns tasks and must be called from inside a tokio runtime.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core_modules::grid_scanner::CancelFlag;
use crate::error::DetectionError;
use crate::pipeline::{DetectionPipeline, Report};

const TASK_QUEUE_DEPTH: usize = 64;

pub struct ScanTask {
    pub image_bytes: Vec<u8>,
    pub cancel: CancelFlag,
    pub result_sender: oneshot::Sender<Report>,
}

pub struct ScanPool {
    task_sender: mpsc::Sender<ScanTask>,
    workers: Vec<JoinHandle<()>>,
}

impl ScanPool {
    pub fn new(pipeline: DetectionPipeline, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let pipeline = Arc::new(pipeline);
        let (task_sender, task_receiver) = mpsc::channel::<ScanTask>(TASK_QUEUE_DEPTH);
        let task_receiver = Arc::new(Mutex::new(task_receiver));

        // Spawn workers
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker_pipeline = Arc::clone(&pipeline);
            let worker_receiver = Arc::clone(&task_receiver);

            let worker = tokio::spawn(async move {
                loop {
                    // the lock is released before the scan starts
                    let Some(task) = worker_receiver.lock().await.recv().await else {
                        break;
                    };
                    let ScanTask {
                        image_bytes,
                        cancel,
                        result_sender,
                    } = task;
                    let scan_pipeline = Arc::clone(&worker_pipeline);

                    let report = tokio::task::spawn_blocking(move || {
                        scan_pipeline.generate_report_with_cancel(&image_bytes, &cancel)
                    })
                    .await
                    .unwrap_or_else(|_| Report::Failed(DetectionError::PoolClosed));

                    debug!(worker_id, failed = report.is_failure(), "scan task done");
                    // the submitter may have given up waiting
                    let _ = result_sender.send(report);
                }
            });

            workers.push(worker);
        }

        Self {
            task_sender,
            workers,
        }
    }

    /// A pool with one worker per logical CPU.
    pub fn with_default_workers(pipeline: DetectionPipeline) -> Self {
        Self::new(pipeline, num_cpus::get())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn scan(&self, image_bytes: Vec<u8>) -> Result<Report, DetectionError> {
        self.scan_with_cancel(image_bytes, CancelFlag::new()).await
    }

    /// Queues one upload and waits for its report. `Err` only when the pool is gone.
    pub async fn scan_with_cancel(
        &self,
        image_bytes: Vec<u8>,
        cancel: CancelFlag,
    ) -> Result<Report, DetectionError> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = ScanTask {
            image_bytes,
            cancel,
            result_sender,
        };

        self.task_sender
            .send(task)
            .await
            .map_err(|_| DetectionError::PoolClosed)?;

        result_receiver.await.map_err(|_| DetectionError::PoolClosed)
    }

    /// Scans several uploads concurrently; reports come back in input order.
    pub async fn scan_batch(&self, images: Vec<Vec<u8>>) -> Vec<Result<Report, DetectionError>> {
        join_all(images.into_iter().map(|bytes| self.scan(bytes))).await
    }

    /// Stops accepting work and waits for queued scans to drain.
    pub async fn shutdown(self) {
        let Self {
            task_sender,
            workers,
        } = self;
        drop(task_sender);
        for worker in workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::utils::image_helper::encode_png;
    use crate::pipeline::DetectionConfig;
    use image::{Rgb, RgbImage};

    fn wall_png(offset: u32) -> Vec<u8> {
        let mut image = RgbImage::new(80, 80);
        image.put_pixel(offset, offset, Rgb([255, 0, 0]));
        image.put_pixel(offset + 40, offset, Rgb([0, 255, 0]));
        encode_png(&image).expect("encode")
    }

    fn pipeline() -> DetectionPipeline {
        DetectionPipeline::new(DetectionConfig::default()).expect("pipeline")
    }

    #[tokio::test]
    async fn pool_matches_direct_pipeline() {
        let pool = ScanPool::new(pipeline(), 2);
        let bytes = wall_png(10);
        let pooled = pool.scan(bytes.clone()).await.expect("pool alive").into_result();
        assert_eq!(pooled, pipeline().detect(&bytes));
        assert_eq!(pooled.total_holds(), 2);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let pool = ScanPool::new(pipeline(), 3);
        let images: Vec<Vec<u8>> = [0, 5, 10, 15, 20].iter().map(|&o| wall_png(o)).collect();
        let reports = pool.scan_batch(images.clone()).await;
        assert_eq!(reports.len(), images.len());
        for (report, bytes) in reports.into_iter().zip(&images) {
            let result = report.expect("pool alive").into_result();
            assert_eq!(result, pipeline().detect(bytes));
        }
        pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_scan_does_not_hold_back_small_ones() {
        let pool = Arc::new(ScanPool::new(
            DetectionPipeline::new(DetectionConfig::with_step(1)).expect("pipeline"),
            2,
        ));
        let large = encode_png(&RgbImage::new(2000, 2000)).expect("encode");

        let slow_pool = Arc::clone(&pool);
        let slow = tokio::spawn(async move { slow_pool.scan(large).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        for offset in [0, 5, 10, 15, 20, 25] {
            let report = pool.scan(wall_png(offset)).await.expect("pool alive");
            assert_eq!(report.into_result().total_holds(), 2);
        }
        assert!(!slow.is_finished(), "small scans waited for the large one");

        let report = slow.await.expect("join").expect("pool alive");
        assert!(matches!(report, Report::NothingFound));
    }

    #[tokio::test]
    async fn cancelled_task_reports_failure() {
        let pool = ScanPool::new(pipeline(), 1);
        let flag = CancelFlag::new();
        flag.cancel();
        let report = pool.scan_with_cancel(wall_png(10), flag).await.expect("pool alive");
        assert!(matches!(report, Report::Failed(DetectionError::Cancelled)));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn garbage_upload_is_a_soft_failure() {
        let pool = ScanPool::with_default_workers(pipeline());
        assert!(pool.worker_count() >= 1);
        let report = pool.scan(b"not an image".to_vec()).await.expect("pool alive");
        assert!(report.is_failure());
        assert!(report.into_result().is_empty());
        pool.shutdown().await;
    }
}
