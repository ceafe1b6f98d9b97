//! Three-stage pipeline in one process: a source pushes frames into a worker
//! running a registered grayscale unit, and a sink pulls the results.
//!
//! Run with:
//!   cargo run --example relay-pipeline

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pupila::message::{deserialize, serialize, FrameMessage, PixelView, RgbImageMsg};
use pupila::worker::{
    FrameOutput, InputPullSocket, OutputPushSocket, ProcessingUnit, PullSocket, PushSocket,
    UnitError, UnitLoader, Worker,
};

const FRAMES: u32 = 5;

struct Grayscale;

impl ProcessingUnit for Grayscale {
    fn name(&self) -> &str {
        "demo:grayscale"
    }

    fn process<'a>(&mut self, mut frame: PixelView<'a>) -> Result<FrameOutput<'a>, UnitError> {
        for mut pixel in frame.as_array_mut().rows_mut() {
            let luma =
                (u16::from(pixel[0]) * 77 + u16::from(pixel[1]) * 150 + u16::from(pixel[2]) * 29) >> 8;
            pixel.fill(luma as u8);
        }
        Ok(FrameOutput::View(frame))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("pupila-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&sock_dir)?;
    let input_path = sock_dir.join("worker-in.sock");
    let output_path = sock_dir.join("worker-out.sock");

    // Bind the sink first so the worker's first push has somewhere to go.
    let mut sink = InputPullSocket::new(&output_path, Duration::from_millis(50));
    sink.recv()?;

    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = cancel.clone();
    let (worker_in, worker_out) = (input_path.clone(), output_path.clone());
    let worker = thread::spawn(move || {
        let loader = UnitLoader::new().with_unit("demo:grayscale", || Box::new(Grayscale));
        let mut worker = Worker::new("demo:grayscale");
        worker.start(
            &loader,
            InputPullSocket::new(worker_in, Duration::from_millis(50)),
            OutputPushSocket::new(worker_out),
            &worker_cancel,
        )
    });

    while !input_path.exists() {
        thread::sleep(Duration::from_millis(10));
    }

    let mut source = OutputPushSocket::new(&input_path);
    for i in 0..FRAMES {
        let (height, width) = (48, 64);
        let data: Vec<u8> = (0..height * width * 3)
            .map(|p| ((p + i * 40) % 256) as u8)
            .collect();
        let msg = RgbImageMsg::new(height, width, data.as_slice())?;
        source.send(&serialize(&FrameMessage::RgbImage(msg)))?;
    }
    eprintln!("Sent {FRAMES} frames to {}", input_path.display());

    let mut received = 0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while received < FRAMES && Instant::now() < deadline {
        let Some(payload) = sink.recv()? else {
            continue;
        };
        if let FrameMessage::RgbImage(mut msg) = deserialize(payload)? {
            let (height, width) = (msg.height(), msg.width());
            let view = msg.pixel_view()?;
            eprintln!(
                "Frame {received}: {height}x{width} first pixel {:?}",
                view.pixel(0, 0)
            );
        }
        received += 1;
    }

    cancel.store(true, Ordering::SeqCst);
    let report = worker
        .join()
        .map_err(|_| "worker thread panicked")??;
    eprintln!(
        "Worker {} stopped ({:?}): forwarded {}, dropped {}",
        report.unit, report.stop_reason, report.stats.forwarded, report.stats.dropped
    );

    source.close()?;
    sink.close()?;
    let _ = std::fs::remove_dir_all(&sock_dir);
    Ok(())
}
