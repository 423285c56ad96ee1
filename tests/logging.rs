use std::io;
use std::sync::{Arc, Mutex};

use hold_vision::{DetectionConfig, DetectionPipeline, LaunchDataVerifier, LaunchPayload};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter(Arc::clone(&self.0))
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn text(&self) -> String {
        let bytes = self.0.lock().expect("lock output").clone();
        String::from_utf8(bytes).expect("utf8 log output")
    }
}

fn capture(run: impl FnOnce()) -> String {
    let sink = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::with_default(subscriber, run);
    sink.text()
}

// The only test in this binary that builds an unconfigured verifier, so the
// once-per-process report is still pending when it runs.
#[test]
fn missing_bot_token_is_reported_once() {
    let output = capture(|| {
        let payload = LaunchPayload::from_pairs([("id", "1"), ("hash", "00")]);
        for _ in 0..3 {
            let verifier = LaunchDataVerifier::new("");
            assert!(!verifier.verify(&payload));
        }
        assert!(!LaunchDataVerifier::from_optional(None).verify(&payload));
    });

    let reports: Vec<&str> = output
        .lines()
        .filter(|line| line.contains("BOT_TOKEN is not configured"))
        .collect();
    assert_eq!(reports.len(), 1, "{output}");
    assert!(reports[0].contains("ERROR"));
}

#[test]
fn undecodable_upload_is_logged_as_error() {
    let pipeline = DetectionPipeline::new(DetectionConfig::default()).expect("pipeline");
    let output = capture(|| {
        assert!(pipeline.detect(b"definitely not an image").is_empty());
    });

    let line = output
        .lines()
        .find(|line| line.contains("error detecting holds"))
        .expect("decode failure logged");
    assert!(line.contains("ERROR"));
    assert!(line.contains("failed to decode image"));
}

#[test]
fn plain_image_logs_nothing_at_info() {
    let pipeline = DetectionPipeline::new(DetectionConfig::default()).expect("pipeline");
    let image = image::RgbImage::new(20, 20);
    let bytes = hold_vision::core_modules::utils::image_helper::encode_png(&image).expect("png");
    let output = capture(|| {
        assert!(pipeline.detect(&bytes).is_empty());
    });
    assert!(output.trim().is_empty(), "{output}");
}
