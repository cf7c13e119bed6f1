//! GPIO module.
//!
//! Same shape as the ADC module: a [`GpioBackend`] shim, the [`GpioModule`]
//! ops, the [`GpioManager`] that ties a backend to a registry keyed by line
//! id, and the owned [`GpioPin`].

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ArtikError, Result};
use crate::registry::{Handle, HandleRegistry};

/// Line direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioDirection {
    /// Input line
    #[default]
    In,
    /// Output line
    Out,
}

impl GpioDirection {
    /// Sysfs spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for GpioDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge that raises an interrupt on an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioEdge {
    /// No interrupt
    #[default]
    None,
    /// Low to high
    Rising,
    /// High to low
    Falling,
    /// Either transition
    Both,
}

impl GpioEdge {
    /// Sysfs spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Both => "both",
        }
    }
}

/// Configuration of one GPIO line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioConfig {
    /// Line number
    pub id: u32,
    /// User-visible name
    #[serde(default)]
    pub name: String,
    /// Direction
    #[serde(default)]
    pub direction: GpioDirection,
    /// Interrupt edge (inputs only)
    #[serde(default)]
    pub edge: GpioEdge,
    /// Level driven right after request (outputs only)
    #[serde(default)]
    pub initial_value: bool,
}

impl GpioConfig {
    /// Input line with no edge detection.
    pub fn input(id: u32) -> Self {
        Self {
            id,
            name: format!("gpio{}", id),
            direction: GpioDirection::In,
            edge: GpioEdge::None,
            initial_value: false,
        }
    }

    /// Output line starting at `initial_value`.
    pub fn output(id: u32, initial_value: bool) -> Self {
        Self {
            direction: GpioDirection::Out,
            initial_value,
            ..Self::input(id)
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the interrupt edge.
    pub fn with_edge(mut self, edge: GpioEdge) -> Self {
        self.edge = edge;
        self
    }
}

/// OS-specific GPIO shim.
pub trait GpioBackend: Send + Sync + 'static {
    /// Open per-line state.
    type Line: Send;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Claim and configure the line.
    fn open(&self, config: &GpioConfig) -> Result<Self::Line>;

    /// Read the line level.
    fn read(&self, line: &mut Self::Line) -> Result<bool>;

    /// Drive the line level.
    fn write(&self, line: &mut Self::Line, value: bool) -> Result<()>;

    /// Give the line back to the OS.
    fn close(&self, _line: &mut Self::Line) -> Result<()> {
        Ok(())
    }
}

/// GPIO module ops.
pub trait GpioModule: Send + Sync {
    /// Claim a line. Fails with `Busy` if the line is already requested.
    fn request(&self, config: &GpioConfig) -> Result<Handle>;

    /// Release a line.
    fn release(&self, handle: Handle) -> Result<()>;

    /// Read the line level.
    fn read(&self, handle: Handle) -> Result<bool>;

    /// Drive an output line. Fails with `BadArgs` on inputs.
    fn write(&self, handle: Handle, value: bool) -> Result<()>;

    /// Name the line was requested with.
    fn name(&self, handle: Handle) -> Result<String>;

    /// Direction the line was requested with.
    fn direction(&self, handle: Handle) -> Result<GpioDirection>;

    /// Line number.
    fn id(&self, handle: Handle) -> Result<u32>;

    /// Number of live handles.
    fn active_count(&self) -> usize;
}

struct GpioNode<L> {
    config: GpioConfig,
    line: L,
}

/// [`GpioModule`] implementation over one backend.
pub struct GpioManager<B: GpioBackend> {
    backend: B,
    lines: Mutex<HandleRegistry<u32, GpioNode<B::Line>>>,
}

impl<B: GpioBackend> GpioManager<B> {
    /// Create a manager with no lines requested.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            lines: Mutex::new(HandleRegistry::new()),
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn with_config<R>(&self, handle: Handle, f: impl FnOnce(&GpioConfig) -> R) -> Result<R> {
        self.lines
            .lock()
            .get(handle)
            .map(|node| f(&node.config))
            .ok_or(ArtikError::UnknownHandle { handle })
    }
}

impl<B: GpioBackend> GpioModule for GpioManager<B> {
    fn request(&self, config: &GpioConfig) -> Result<Handle> {
        let mut lines = self.lines.lock();
        if lines.contains_key(&config.id) {
            return Err(ArtikError::AlreadyRequested {
                module: "gpio",
                key: config.id,
            });
        }

        let line = self.backend.open(config)?;
        let node = GpioNode {
            config: config.clone(),
            line,
        };
        let handle = lines
            .insert(config.id, node)
            .map_err(|_| ArtikError::AlreadyRequested {
                module: "gpio",
                key: config.id,
            })?;

        debug!(
            backend = self.backend.name(),
            id = config.id,
            direction = %config.direction,
            %handle,
            "Requested GPIO line"
        );
        Ok(handle)
    }

    fn release(&self, handle: Handle) -> Result<()> {
        let mut lines = self.lines.lock();
        let node = lines
            .get_mut(handle)
            .ok_or(ArtikError::UnknownHandle { handle })?;
        self.backend.close(&mut node.line)?;

        if let Some((id, _)) = lines.remove(handle) {
            debug!(backend = self.backend.name(), id, %handle, "Released GPIO line");
        }
        Ok(())
    }

    fn read(&self, handle: Handle) -> Result<bool> {
        let mut lines = self.lines.lock();
        let node = lines
            .get_mut(handle)
            .ok_or(ArtikError::UnknownHandle { handle })?;
        self.backend.read(&mut node.line)
    }

    fn write(&self, handle: Handle, value: bool) -> Result<()> {
        let mut lines = self.lines.lock();
        let node = lines
            .get_mut(handle)
            .ok_or(ArtikError::UnknownHandle { handle })?;
        if node.config.direction != GpioDirection::Out {
            return Err(ArtikError::invalid(format!(
                "gpio {} is an input line",
                node.config.id
            )));
        }
        self.backend.write(&mut node.line, value)
    }

    fn name(&self, handle: Handle) -> Result<String> {
        self.with_config(handle, |c| c.name.clone())
    }

    fn direction(&self, handle: Handle) -> Result<GpioDirection> {
        self.with_config(handle, |c| c.direction)
    }

    fn id(&self, handle: Handle) -> Result<u32> {
        self.with_config(handle, |c| c.id)
    }

    fn active_count(&self) -> usize {
        self.lines.lock().len()
    }
}

impl<B: GpioBackend> Drop for GpioManager<B> {
    fn drop(&mut self) {
        for (handle, id, mut node) in self.lines.get_mut().drain() {
            warn!(id, %handle, "GPIO line still requested at module teardown");
            if let Err(e) = self.backend.close(&mut node.line) {
                warn!(id, error = %e, "Failed to release GPIO line");
            }
        }
    }
}

/// An owned GPIO line, released on drop.
pub struct GpioPin {
    module: Arc<dyn GpioModule>,
    handle: Handle,
    config: GpioConfig,
    released: bool,
}

impl GpioPin {
    /// Request `config` from `module`.
    pub fn request(module: Arc<dyn GpioModule>, config: GpioConfig) -> Result<Self> {
        let handle = module.request(&config)?;
        Ok(Self {
            module,
            handle,
            config,
            released: false,
        })
    }

    /// Read the line level.
    pub fn read(&self) -> Result<bool> {
        self.module.read(self.handle)
    }

    /// Drive the line level.
    pub fn write(&self, value: bool) -> Result<()> {
        self.module.write(self.handle, value)
    }

    /// Line number.
    pub fn id(&self) -> u32 {
        self.config.id
    }

    /// Line name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Line direction.
    pub fn direction(&self) -> GpioDirection {
        self.config.direction
    }

    /// Release now and report the outcome.
    ///
    /// On failure the pin keeps its handle so the release can be retried.
    pub fn release(&mut self) -> Result<()> {
        if !self.released {
            self.module.release(self.handle)?;
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for GpioPin {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.module.release(self.handle) {
                warn!(id = self.config.id, error = %e, "Failed to release GPIO line");
            }
        }
    }
}

impl fmt::Debug for GpioPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioPin")
            .field("id", &self.config.id)
            .field("direction", &self.config.direction)
            .field("handle", &self.handle)
            .finish()
    }
}
