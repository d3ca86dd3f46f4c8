//! Lifecycle and error trace events.
//!
//! The core emits structured events through a [`TelemetrySink`] and never
//! decides how they are presented. The default sink forwards them to
//! `tracing`; tests plug in a [`RecordingTelemetrySink`] to assert on them.
//!
//! Sinks are best-effort: they must not block and must not fail the call that
//! emitted the event.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::ErrorKind;
use crate::registry::{ResourceId, ResourceKind};

// =============================================================================
// Event payload types
// =============================================================================

/// How an operation was dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallMode {
    /// Inline on the caller thread.
    Sync,
    /// On the worker pool.
    Async,
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Async => write!(f, "async"),
        }
    }
}

/// What triggered a close.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloseOrigin {
    /// `close()` / `close_async()` called by user code.
    Explicit,
    /// The last handle became unreachable.
    Finalizer,
    /// The bridge was dropped with the resource still open.
    Shutdown,
}

impl fmt::Display for CloseOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Finalizer => write!(f, "finalizer"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

// =============================================================================
// Telemetry Events
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum TelemetryEvent {
    /// A native object was registered and bound to a handle.
    ResourceRegistered {
        id: ResourceId,
        kind: ResourceKind,
        parent: Option<ResourceId>,
    },

    /// A resource was closed. `released` is false for parent-owned objects
    /// whose parent was already gone.
    ResourceClosed {
        id: ResourceId,
        kind: ResourceKind,
        origin: CloseOrigin,
        released: bool,
    },

    /// An operation finished, successfully or not.
    OperationCompleted {
        operation: &'static str,
        mode: CallMode,
        duration: Duration,
        error: Option<ErrorKind>,
    },

    /// An unreachable open handle was queued for release.
    FinalizerScheduled { id: ResourceId, kind: ResourceKind },

    /// A finalizer-driven release failed. Logged, never surfaced to callers.
    FinalizerFailed {
        id: ResourceId,
        kind: ResourceKind,
        message: String,
    },

    /// A process-wide configuration key was set or cleared.
    ConfigOptionChanged { key: String, value: Option<String> },
}

impl TelemetryEvent {
    /// Returns the resource this event concerns, if any.
    pub fn resource_id(&self) -> Option<ResourceId> {
        match self {
            Self::ResourceRegistered { id, .. }
            | Self::ResourceClosed { id, .. }
            | Self::FinalizerScheduled { id, .. }
            | Self::FinalizerFailed { id, .. } => Some(*id),
            Self::OperationCompleted { .. } | Self::ConfigOptionChanged { .. } => None,
        }
    }

    /// Returns a short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ResourceRegistered { .. } => "resource_registered",
            Self::ResourceClosed { .. } => "resource_closed",
            Self::OperationCompleted { .. } => "operation_completed",
            Self::FinalizerScheduled { .. } => "finalizer_scheduled",
            Self::FinalizerFailed { .. } => "finalizer_failed",
            Self::ConfigOptionChanged { .. } => "config_option_changed",
        }
    }
}

// =============================================================================
// Telemetry Sink Trait
// =============================================================================

/// Sink for telemetry events.
///
/// Events are emitted from the caller thread and from pool workers, so
/// implementations must be `Send + Sync` and should return quickly.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}

// =============================================================================
// Built-in Sink Implementations
// =============================================================================

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Writes events as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        match &event {
            TelemetryEvent::ResourceRegistered { id, kind, parent } => {
                tracing::debug!(
                    resource = %id,
                    kind = %kind,
                    parent = ?parent,
                    "Resource registered"
                );
            }
            TelemetryEvent::ResourceClosed {
                id,
                kind,
                origin,
                released,
            } => {
                tracing::debug!(
                    resource = %id,
                    kind = %kind,
                    origin = %origin,
                    released = released,
                    "Resource closed"
                );
            }
            TelemetryEvent::OperationCompleted {
                operation,
                mode,
                duration,
                error,
            } => match error {
                Some(kind) => tracing::debug!(
                    operation = operation,
                    mode = %mode,
                    duration_us = duration.as_micros() as u64,
                    error = %kind,
                    "Operation failed"
                ),
                None => tracing::trace!(
                    operation = operation,
                    mode = %mode,
                    duration_us = duration.as_micros() as u64,
                    "Operation completed"
                ),
            },
            TelemetryEvent::FinalizerScheduled { id, kind } => {
                tracing::trace!(resource = %id, kind = %kind, "Finalizer scheduled");
            }
            TelemetryEvent::FinalizerFailed { id, kind, message } => {
                tracing::warn!(
                    resource = %id,
                    kind = %kind,
                    error = %message,
                    "Finalizer failed to release resource"
                );
            }
            TelemetryEvent::ConfigOptionChanged { key, value } => {
                tracing::info!(key = %key, value = ?value, "Config option changed");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingTelemetrySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events seen so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    /// Number of events of the given type.
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TelemetrySink for RecordingTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that forwards events to multiple sinks.
pub struct MultiplexTelemetrySink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl MultiplexTelemetrySink {
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }

    pub fn add_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }
}

impl TelemetrySink for MultiplexTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

impl fmt::Debug for MultiplexTelemetrySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiplexTelemetrySink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
