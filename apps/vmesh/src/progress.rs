//! ANSI single-line progress bar, redrawn by a dedicated reporter thread
//! polling a shared `AtomicU64` counter against a known total.

use std::io::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

const WIDTH: usize = 20;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shared lock serializing every print to stdout, across the main thread's
/// milestone messages and the progress reporter's redraws.
pub type Stdout = Arc<Mutex<()>>;

pub fn shared_stdout() -> Stdout {
    Arc::new(Mutex::new(()))
}

pub fn println_locked(stdout: &Stdout, message: &str) {
    let _guard = stdout.lock();
    println!("{message}");
}

/// Owns the progress-reporter thread for one pipeline stage. Dropping it
/// stops the thread and joins it, so callers get a clean handoff between
/// successive stages' bars without overlapping redraws.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Spawn a reporter that redraws `title`'s bar until `completed` reaches
    /// `total` (or this `ProgressReporter` is dropped, whichever first).
    /// Returns the counter the caller's worker loop should increment.
    pub fn start(title: &'static str, total: u64, stdout: Stdout) -> (Arc<AtomicU64>, Self) {
        let completed = Arc::new(AtomicU64::new(0));
        let worker_completed = Arc::clone(&completed);

        // Reserve the line the reporter thread will redraw in place; its
        // first `draw` moves the cursor up onto this line rather than onto
        // whatever was printed before it started.
        {
            let _guard = stdout.lock();
            println!();
        }

        let handle = thread::Builder::new()
            .name("vmesh-progress".into())
            .spawn(move || loop {
                let done = worker_completed.load(Ordering::Relaxed).min(total);
                {
                    let _guard = stdout.lock();
                    draw(title, done, total);
                }
                if done >= total {
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            })
            .expect("failed to spawn progress reporter thread");

        (completed, Self { handle: Some(handle) })
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn draw(title: &str, done: u64, total: u64) {
    let fraction = if total == 0 { 1.0 } else { done as f32 / total as f32 };
    let filled = (fraction * WIDTH as f32).ceil() as usize;
    let filled = filled.min(WIDTH);

    print!("\x1b[1F\x1b[2K{title} [");
    for _ in 0..filled {
        print!("#");
    }
    for _ in filled..WIDTH {
        print!(" ");
    }
    println!("] {}%", (fraction * 100.0).ceil() as u32);
    let _ = std::io::stdout().flush();
}
