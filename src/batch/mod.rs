//! Run many independent tasks on a worker pool
//!
//! Workers pull task indexes from a pre-filled queue and report `Started` and
//! `Done` events. The calling thread is the only one writing to the terminal:
//! it redraws a single status line on every event and prints one line per
//! finished task above it. Failures never stop the other tasks; the batch
//! fails as a whole once everything has finished.

mod tracker;

pub use tracker::Tracker;

use crossterm::cursor::MoveToPreviousLine;
use crossterm::queue;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};
use std::sync::{Mutex, mpsc};
use std::thread;
use std::time::Instant;
use tracing::debug;

use crate::error::{BatchError, Result};
use crate::term::terminal_width;

/// A unit of work in a batch
pub trait Task: Sync {
    type Output: Send;

    /// Shown in the status line and the result list
    fn name(&self) -> String;

    fn run(&self) -> Result<Self::Output>;
}

/// Worker to aggregator message
enum Report<T> {
    Started { index: usize },
    Done { index: usize, result: Result<T> },
}

/// Run `tasks` with one worker per logical CPU, drawing progress on stderr
///
/// Results come back in submission order. If any task fails the error lists
/// every failure and no results are returned.
pub fn run<T: Task>(desc: &str, tasks: &[T]) -> Result<Vec<T::Output>> {
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    run_with(desc, tasks, workers, &mut io::stderr(), None)
}

/// Like [`run`] with an explicit worker count, output and fixed width
pub fn run_with<T: Task, W: Write>(
    desc: &str,
    tasks: &[T],
    workers: usize,
    out: &mut W,
    width: Option<usize>,
) -> Result<Vec<T::Output>> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, tasks.len());
    let start = Instant::now();

    let (job_tx, job_rx) = mpsc::channel::<usize>();
    for index in 0..tasks.len() {
        // the receiver is alive until the scope below ends
        let _ = job_tx.send(index);
    }
    drop(job_tx);
    let job_rx = Mutex::new(job_rx);

    let mut tracker = Tracker::new(desc, tasks.iter().map(T::name).collect());
    let mut results: Vec<Option<T::Output>> = tasks.iter().map(|_| None).collect();
    let mut failures: Vec<(usize, String)> = Vec::new();

    writeln!(out, "{} with {} workers", desc, workers)?;
    draw(out, &tracker, width, false)?;

    thread::scope(|scope| -> Result<()> {
        let (report_tx, report_rx) = mpsc::channel::<Report<T::Output>>();
        for worker in 0..workers {
            let report_tx = report_tx.clone();
            let job_rx = &job_rx;
            scope.spawn(move || {
                loop {
                    let next = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok(index) = next else {
                        break;
                    };
                    debug!("Worker {} runs task {}", worker, index);
                    if report_tx.send(Report::Started { index }).is_err() {
                        break;
                    }
                    let result = tasks[index].run();
                    if report_tx.send(Report::Done { index, result }).is_err() {
                        break;
                    }
                }
            });
        }
        drop(report_tx);

        for report in report_rx {
            match report {
                Report::Started { index } => {
                    tracker.start(index);
                    draw(out, &tracker, width, true)?;
                }
                Report::Done { index, result } => {
                    tracker.finish(index);
                    let status = match result {
                        Ok(output) => {
                            results[index] = Some(output);
                            "ok".green()
                        }
                        Err(e) => {
                            debug!("Task {} failed: {}", tracker.name(index), e);
                            failures.push((index, e.to_string()));
                            "fail".red()
                        }
                    };
                    queue!(out, MoveToPreviousLine(1), Clear(ClearType::CurrentLine))?;
                    writeln!(out, "{} {} {}", tracker.desc().bold(), tracker.name(index), status)?;
                    draw(out, &tracker, width, false)?;
                }
            }
        }
        Ok(())
    })?;

    let ok = tasks.len() - failures.len();
    let status = if failures.is_empty() {
        "ok".green()
    } else {
        "fail".red()
    };
    queue!(out, MoveToPreviousLine(1), Clear(ClearType::CurrentLine))?;
    writeln!(
        out,
        "{} result: {}. {} ok; {} failed; finished in {:.2?}",
        desc,
        status,
        ok,
        failures.len(),
        start.elapsed()
    )?;

    if failures.is_empty() {
        out.flush()?;
        return Ok(results.into_iter().flatten().collect());
    }

    failures.sort_by_key(|(index, _)| *index);
    writeln!(out)?;
    writeln!(out, "Error message:")?;
    let failures: Vec<(String, String)> = failures
        .into_iter()
        .map(|(index, message)| (tracker.name(index).to_string(), message))
        .collect();
    for (name, message) in &failures {
        writeln!(out, "  {}: {}", name, message)?;
    }
    out.flush()?;

    Err(BatchError {
        desc: desc.to_string(),
        failures,
    }
    .into())
}

/// Write the status line, replacing the previous one when `redraw` is set
fn draw<W: Write>(out: &mut W, tracker: &Tracker, width: Option<usize>, redraw: bool) -> io::Result<()> {
    if redraw {
        queue!(out, MoveToPreviousLine(1), Clear(ClearType::CurrentLine))?;
    }
    let width = width.unwrap_or_else(terminal_width);
    writeln!(out, "{}", tracker.render(width))?;
    out.flush()
}
