#![forbid(unsafe_code)]

//! Mounted instance: wires a scene tree, a renderer and a stream together.
//!
//! # Lifecycle
//!
//! ```text
//! Mounted ──unmount()──▶ Unmounting ──▶ Unmounted
//! ```
//!
//! While mounted, the tree's trigger requests are drained by
//! [`Instance::pump`] (called after every `render`) and by
//! [`Instance::tick`], which also fires trailing throttled frames once their
//! window has elapsed. A host loop only has to call `tick` no later than
//! [`Instance::next_deadline`].
//!
//! Unmounting runs one last compositor pass, detaches the triggers, performs
//! the mode-specific final write, tears the tree content down, releases the
//! stream and settles the exit signal. Each step runs even if an earlier
//! write failed; the first write error is returned afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use inkling_core::environment::Environment;
use tracing::{debug, info, trace, warn};

use crate::compositor::{Compositor, RenderMode, SchedulerState};
use crate::debug_trace::{self, TraceEvent};
use crate::error::{Error, Result};
use crate::exit::{ExitOutcome, ExitReason, ExitResolver, ExitSignal};
use crate::frame::{RenderContext, Renderer, SceneTree};
use crate::registry::{InstanceId, SharedHandle, StreamRegistry};
use crate::stream::{OutputStream, StreamId};
use crate::throttle::{RenderThrottle, ThrottleAction, ThrottleConfig, ThrottleStats};
use crate::triggers::FrameTriggers;

/// Construction options for an instance.
///
/// # Example
///
/// ```
/// use inkling_runtime::RenderOptions;
///
/// let options = RenderOptions::default()
///     .with_debug(false)
///     .with_columns(100)
///     .with_ci(false);
/// assert_eq!(options.columns, Some(100));
/// ```
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Re-emit the full output on every frame, without throttling.
    pub debug: bool,
    /// Whether Ctrl+C should unmount the tree. Passed to the renderer
    /// context for input handling; the runtime does not read input.
    pub exit_on_ctrl_c: bool,
    /// Column count handed to the renderer. Defaults to the stream width.
    pub columns: Option<u16>,
    /// Force CI (`Some(true)`) or interactive (`Some(false)`) behavior.
    /// `None` detects from the environment.
    pub ci: Option<bool>,
    /// Throttle applied to regular triggers in interactive mode.
    pub throttle: ThrottleConfig,
    /// Stream registry. Defaults to [`StreamRegistry::global`].
    pub registry: Option<Arc<StreamRegistry>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            debug: false,
            exit_on_ctrl_c: true,
            columns: None,
            ci: None,
            throttle: ThrottleConfig::default(),
            registry: None,
        }
    }
}

impl RenderOptions {
    /// Enable or disable debug mode.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set whether Ctrl+C exits.
    #[must_use]
    pub fn with_exit_on_ctrl_c(mut self, enabled: bool) -> Self {
        self.exit_on_ctrl_c = enabled;
        self
    }

    /// Override the column count given to the renderer.
    #[must_use]
    pub fn with_columns(mut self, columns: u16) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Force CI or interactive behavior instead of detecting it.
    #[must_use]
    pub fn with_ci(mut self, ci: bool) -> Self {
        self.ci = Some(ci);
        self
    }

    /// Set the throttle configuration.
    #[must_use]
    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    /// Use an explicit registry instead of the global one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<StreamRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Mode these options select in the current environment.
    #[must_use]
    pub fn resolve_mode(&self) -> RenderMode {
        let ci = self.ci.unwrap_or_else(|| Environment::detect().is_ci());
        RenderMode::resolve(self.debug, ci)
    }

    fn registry(&self) -> Arc<StreamRegistry> {
        self.registry.clone().unwrap_or_else(StreamRegistry::global)
    }
}

/// Mount state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepting renders and triggers.
    Mounted,
    /// Final flush in progress.
    Unmounting,
    /// Torn down; every operation is a no-op.
    Unmounted,
}

/// A scene tree mounted on an output stream.
pub struct Instance<T, R, S>
where
    T: SceneTree,
    R: Renderer<T>,
    S: OutputStream,
{
    id: InstanceId,
    stream_id: StreamId,
    tree: T,
    renderer: R,
    compositor: Compositor<S>,
    throttle: RenderThrottle,
    triggers: FrameTriggers,
    columns: Option<u16>,
    exit_on_ctrl_c: bool,
    lifecycle: Lifecycle,
    exit_signal: ExitSignal,
    resolver: Option<ExitResolver>,
    registry: Arc<StreamRegistry>,
}

impl<T, R, S> Instance<T, R, S>
where
    T: SceneTree,
    R: Renderer<T>,
    S: OutputStream,
{
    /// Mount `tree` on `stream`.
    ///
    /// Fails with [`Error::StreamBusy`] if another instance owns the stream.
    pub fn mount(mut tree: T, renderer: R, stream: S, options: RenderOptions) -> Result<Self> {
        let id = InstanceId::next();
        let stream_id = stream.id();
        let registry = options.registry();
        registry.claim(stream_id, id)?;

        let mode = options.resolve_mode();
        let triggers = FrameTriggers::new();
        tree.attach(triggers.clone());
        let (exit_signal, resolver) = ExitSignal::new();

        info!(
            instance = id.get(),
            stream = %stream_id,
            mode = mode.as_str(),
            "instance mounted"
        );

        Ok(Self {
            id,
            stream_id,
            tree,
            renderer,
            compositor: Compositor::new(stream, mode),
            throttle: RenderThrottle::new(options.throttle),
            triggers,
            columns: options.columns,
            exit_on_ctrl_c: options.exit_on_ctrl_c,
            lifecycle: Lifecycle::Mounted,
            exit_signal,
            resolver: Some(resolver),
            registry,
        })
    }

    /// Replace the mounted content and paint what the tree requests.
    ///
    /// Ignored after unmount.
    pub fn render(&mut self, element: T::Element) -> Result<()> {
        self.render_at(element, Instant::now())
    }

    /// [`render`](Self::render) at a specific time (for testing).
    pub fn render_at(&mut self, element: T::Element, now: Instant) -> Result<()> {
        if self.lifecycle != Lifecycle::Mounted {
            trace!(instance = self.id.get(), "render after unmount ignored");
            return Ok(());
        }
        self.tree.update(Some(element));
        self.pump_at(now)
    }

    /// Alias of [`render`](Self::render).
    pub fn rerender(&mut self, element: T::Element) -> Result<()> {
        self.render(element)
    }

    /// Drain trigger requests.
    pub fn pump(&mut self) -> Result<()> {
        self.pump_at(Instant::now())
    }

    /// Drain trigger requests at a specific time (for testing).
    ///
    /// Immediate requests, and regular requests outside interactive mode,
    /// run the compositor now. Regular requests in interactive mode go
    /// through the throttle.
    pub fn pump_at(&mut self, now: Instant) -> Result<()> {
        if self.lifecycle != Lifecycle::Mounted {
            return Ok(());
        }
        let request = self.triggers.take();
        if request.is_empty() {
            return Ok(());
        }

        let throttled_mode = self.compositor.mode().is_throttled();
        if request.immediate || !throttled_mode {
            self.composite_now()?;
            if request.throttled && throttled_mode {
                self.throttle.record_external_run(now);
            }
            return Ok(());
        }

        match self.throttle.trigger_at(now) {
            ThrottleAction::Run(_) => self.composite_now(),
            ThrottleAction::Deferred { until } => {
                debug_trace::emit(TraceEvent::Deferred {
                    instance: self.id.get(),
                    wait: until.saturating_duration_since(now),
                });
                Ok(())
            }
            ThrottleAction::Idle => Ok(()),
        }
    }

    /// Drain trigger requests and fire a due trailing frame.
    pub fn tick(&mut self) -> Result<()> {
        self.tick_at(Instant::now())
    }

    /// [`tick`](Self::tick) at a specific time (for testing).
    pub fn tick_at(&mut self, now: Instant) -> Result<()> {
        self.pump_at(now)?;
        if self.lifecycle != Lifecycle::Mounted {
            return Ok(());
        }
        match self.throttle.tick_at(now) {
            ThrottleAction::Run(_) => self.composite_now(),
            ThrottleAction::Deferred { .. } | ThrottleAction::Idle => Ok(()),
        }
    }

    /// When the pending trailing frame is due, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.throttle.trailing_deadline()
    }

    /// Unmount cleanly.
    pub fn unmount(&mut self) -> Result<()> {
        self.unmount_with(ExitReason::Clean)
    }

    /// Unmount, settling the exit signal from `reason`.
    ///
    /// A second call is a no-op and leaves the first outcome in place.
    pub fn unmount_with(&mut self, reason: ExitReason) -> Result<()> {
        if self.lifecycle != Lifecycle::Mounted {
            return Ok(());
        }
        self.lifecycle = Lifecycle::Unmounting;
        debug!(
            instance = self.id.get(),
            error = reason.is_error(),
            "unmounting"
        );

        let mut first_error: Option<Error> = None;

        let had_trailing = self.throttle.take_pending();
        self.triggers.take();
        trace!(had_trailing, "final compositor pass");
        if let Err(err) = self.composite_now() {
            first_error.get_or_insert(err);
        }

        self.triggers.detach();

        if let Err(err) = self.compositor.finish() {
            first_error.get_or_insert(err.into());
        }
        self.lifecycle = Lifecycle::Unmounted;

        self.tree.update(None);
        self.registry.release(self.stream_id, self.id);

        debug_trace::emit(TraceEvent::Unmount {
            instance: self.id.get(),
            error: reason.is_error(),
        });
        if let Some(resolver) = self.resolver.take() {
            resolver.settle_with(reason);
        }

        info!(instance = self.id.get(), stream = %self.stream_id, "instance unmounted");
        match first_error {
            Some(err) => {
                warn!(error = %err, "unmount completed with a write error");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Erase the live region (interactive mode).
    pub fn clear(&mut self) -> Result<()> {
        Ok(self.compositor.clear()?)
    }

    /// The exit signal; every call returns the same signal.
    #[must_use]
    pub fn wait_until_exit(&self) -> ExitSignal {
        self.exit_signal.clone()
    }

    /// Release the stream claim without unmounting.
    pub fn cleanup(&self) -> bool {
        self.registry.release(self.stream_id, self.id)
    }

    /// Instance identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Identity of the stream painted on.
    #[inline]
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Mode fixed at mount.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RenderMode {
        self.compositor.mode()
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Whether unmount has completed.
    #[inline]
    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.lifecycle == Lifecycle::Unmounted
    }

    /// Scheduling state.
    #[must_use]
    pub fn state(&self) -> &SchedulerState {
        self.compositor.state()
    }

    /// Throttle counters.
    #[must_use]
    pub fn throttle_stats(&self) -> ThrottleStats {
        self.throttle.stats()
    }

    /// Frames composited so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.compositor.frame_count()
    }

    /// The mounted tree.
    #[must_use]
    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Triggers wired into the tree.
    #[must_use]
    pub fn triggers(&self) -> &FrameTriggers {
        &self.triggers
    }

    /// The output stream.
    #[must_use]
    pub fn stream(&self) -> &S {
        self.compositor.stream()
    }

    fn context(&self) -> RenderContext {
        let size = self.compositor.size();
        RenderContext {
            columns: self.columns.unwrap_or(size.columns),
            rows: size.rows,
            mode: self.compositor.mode(),
            exit_on_ctrl_c: self.exit_on_ctrl_c,
        }
    }

    fn composite_now(&mut self) -> Result<()> {
        if self.compositor.is_unmounted() {
            return Ok(());
        }
        let ctx = self.context();
        let frame = self.renderer.render(&self.tree, &ctx);
        self.compositor.composite(&frame)?;
        Ok(())
    }
}

impl<T, R, S> Drop for Instance<T, R, S>
where
    T: SceneTree,
    R: Renderer<T>,
    S: OutputStream,
{
    fn drop(&mut self) {
        // Settle waiters and restore the cursor.
        if self.lifecycle != Lifecycle::Mounted {
            return;
        }
        if let Err(err) = self.unmount_with(ExitReason::Clean) {
            warn!(error = %err, "unmount on drop failed");
        }
    }
}

/// Shareable handle to a mounted instance.
///
/// Returned by [`render`]. Clones refer to the same instance; the instance
/// lock serializes every compositor run.
pub struct Ink<T, R, S>
where
    T: SceneTree,
    R: Renderer<T>,
    S: OutputStream,
{
    inner: Arc<Mutex<Instance<T, R, S>>>,
    exit: ExitSignal,
}

impl<T, R, S> Clone for Ink<T, R, S>
where
    T: SceneTree,
    R: Renderer<T>,
    S: OutputStream,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            exit: self.exit.clone(),
        }
    }
}

impl<T, R, S> Ink<T, R, S>
where
    T: SceneTree,
    R: Renderer<T>,
    S: OutputStream,
{
    /// Wrap an instance.
    pub fn new(instance: Instance<T, R, S>) -> Self {
        let exit = instance.wait_until_exit();
        Self {
            inner: Arc::new(Mutex::new(instance)),
            exit,
        }
    }

    fn from_shared(inner: Arc<Mutex<Instance<T, R, S>>>) -> Self {
        let exit = inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .wait_until_exit();
        Self { inner, exit }
    }

    fn lock(&self) -> MutexGuard<'_, Instance<T, R, S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the mounted content.
    pub fn rerender(&self, element: T::Element) -> Result<()> {
        self.lock().render(element)
    }

    /// Unmount cleanly.
    pub fn unmount(&self) -> Result<()> {
        self.lock().unmount()
    }

    /// Unmount with a reason.
    pub fn unmount_with(&self, reason: ExitReason) -> Result<()> {
        self.lock().unmount_with(reason)
    }

    /// The exit signal.
    #[must_use]
    pub fn wait_until_exit(&self) -> ExitSignal {
        self.exit.clone()
    }

    /// Release the stream claim without unmounting.
    ///
    /// Also drops the registry's handle, so the instance unmounts when the
    /// last `Ink` clone is dropped.
    pub fn cleanup(&self) -> bool {
        self.lock().cleanup()
    }

    /// Erase the live region.
    pub fn clear(&self) -> Result<()> {
        self.lock().clear()
    }

    /// Drain triggers and fire a due trailing frame.
    pub fn tick(&self) -> Result<()> {
        self.lock().tick()
    }

    /// [`tick`](Self::tick) at a specific time (for testing).
    pub fn tick_at(&self, now: Instant) -> Result<()> {
        self.lock().tick_at(now)
    }

    /// When the pending trailing frame is due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.lock().next_deadline()
    }

    /// Run `f` with exclusive access to the instance.
    pub fn with_instance<O>(&self, f: impl FnOnce(&mut Instance<T, R, S>) -> O) -> O {
        f(&mut self.lock())
    }

    /// Whether two handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drive the instance until it unmounts.
    ///
    /// Ticks whenever a trailing frame is due and at least every `idle`
    /// otherwise, so triggers fired from other threads are painted. Returns
    /// the exit outcome once some other party unmounts the instance.
    pub fn run_until_exit(&self, idle: Duration) -> Result<ExitOutcome> {
        loop {
            if let Some(outcome) = self.exit.outcome() {
                return Ok(outcome);
            }
            self.tick()?;
            let wait = self
                .next_deadline()
                .map_or(idle, |deadline| {
                    deadline.saturating_duration_since(Instant::now()).min(idle)
                });
            if let Some(outcome) = self.exit.wait_timeout(wait) {
                return Ok(outcome);
            }
        }
    }
}

/// Mount `element` on `stream`, or re-render the instance already there.
///
/// If the registry already holds an instance of the same tree, renderer and
/// stream types for this stream, that instance is re-rendered with `element`
/// and returned; `stream` and `build` are dropped unused. Otherwise `build`
/// creates the tree and renderer, and a new instance is mounted and
/// registered.
///
/// The registry holds a handle to every instance mounted here, so dropping
/// the returned [`Ink`] does not unmount it and the cursor stays hidden until
/// [`Ink::unmount`] runs. To rely on unmount-on-drop instead, call
/// [`Ink::cleanup`] first; the instance then unmounts when its last handle
/// is dropped.
pub fn render<T, R, S>(
    element: T::Element,
    stream: S,
    options: RenderOptions,
    build: impl FnOnce() -> (T, R),
) -> Result<Ink<T, R, S>>
where
    T: SceneTree + Send + 'static,
    R: Renderer<T> + Send + 'static,
    S: OutputStream + 'static,
{
    let registry = options.registry();
    let stream_id = stream.id();

    if let Some(handle) = registry.lookup(stream_id) {
        let inner = handle
            .downcast::<Mutex<Instance<T, R, S>>>()
            .map_err(|_| Error::InstanceMismatch(stream_id))?;
        debug!(stream = %stream_id, "reusing mounted instance");
        let ink = Ink::from_shared(inner);
        ink.rerender(element)?;
        return Ok(ink);
    }

    let (tree, renderer) = build();
    let instance = Instance::mount(tree, renderer, stream, options)?;
    let id = instance.id();
    let ink = Ink::new(instance);
    let shared: SharedHandle = ink.inner.clone();
    registry.attach_handle(stream_id, id, shared);
    ink.rerender(element)?;
    Ok(ink)
}
