use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

use engine::{Clock, LoopError, LoopScheduler, LoopState};
use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::control;
use super::gameplay::{self, GameSession};

const RESTART_WAIT_SLICE: Duration = Duration::from_millis(100);

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let (input_tx, input_rx) = mpsc::channel();
    let session = Rc::new(RefCell::new(
        GameSession::new(&app.level, app.session_config).with_input(input_rx),
    ));
    let mut scheduler = LoopScheduler::new(gameplay::loop_callbacks(&session), app.loop_config);

    let loop_handle = scheduler.control_handle();
    let mut reader = None;
    if let Err(err) = scheduler.initialize(|| {
        reader = Some(control::spawn_stdin_reader(input_tx, loop_handle));
    }) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }
    let reader = match reader {
        Some(Ok(reader)) => reader,
        Some(Err(err)) => {
            error!(error = %err, "control_thread_spawn_failed");
            return ExitCode::FAILURE;
        }
        None => {
            error!("control_thread_not_started");
            return ExitCode::FAILURE;
        }
    };

    info!("controls: a/d move, s halt, w or space jump, p pause, r resume or replay, q quit");
    match play(&mut scheduler, &session, || !reader.is_finished()) {
        Ok(runs) => {
            info!(runs, "platformer_finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

/// Plays runs back to back. After a run that ran out of time the loop idles in STOPPED until
/// a resume request starts it again; quit, game over or a closed control input end play.
/// Returns the number of runs played.
fn play<C: Clock>(
    scheduler: &mut LoopScheduler<C>,
    session: &Rc<RefCell<GameSession>>,
    mut control_open: impl FnMut() -> bool,
) -> Result<u32, LoopError> {
    scheduler.start()?;
    let mut runs = 0;
    loop {
        scheduler.run_until_stopped();
        runs += 1;
        log_run(scheduler, &session.borrow());

        if !session.borrow().can_restart() {
            return Ok(runs);
        }
        info!("run over: r plays again, q quits");
        if !await_restart(scheduler, session, &mut control_open) {
            return Ok(runs);
        }
    }
}

fn await_restart<C: Clock>(
    scheduler: &mut LoopScheduler<C>,
    session: &Rc<RefCell<GameSession>>,
    control_open: &mut impl FnMut() -> bool,
) -> bool {
    while scheduler.loop_state() == LoopState::Stopped {
        if session.borrow_mut().take_quit_press() || !control_open() {
            return false;
        }
        scheduler.wait_for_request(RESTART_WAIT_SLICE);
    }
    true
}

fn log_run<C: Clock>(scheduler: &LoopScheduler<C>, session: &GameSession) {
    let body = session.body();
    info!(
        ticks = session.ticks(),
        played_seconds = session.elapsed_seconds(),
        end = ?session.end(),
        health = body.health(),
        x = body.position().x,
        y = body.position().y,
        "session_finished"
    );
    if let Some(summary) = scheduler.last_run_summary() {
        info!(
            total_ticks = summary.total_ticks,
            average_tps = summary.average_tps,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "loop_summary"
        );
    }
    let metrics = scheduler.metrics_handle().snapshot();
    info!(
        tps = metrics.tps,
        tick_time_ms = metrics.tick_time_ms,
        "last_loop_metrics"
    );
}
