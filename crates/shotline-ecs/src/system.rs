//! Systems and the priority-ordered registry that runs them.
//!
//! A [`System`] is a named, stateful unit of per-tick logic. The
//! [`SystemRegistry`] owns systems, sorts them by ascending priority once (ties
//! keep registration order), and runs the enabled ones in that order.

use std::any::Any;
use std::time::{Duration, Instant};

use crate::world::World;
use crate::EcsError;

// ---------------------------------------------------------------------------
// System trait
// ---------------------------------------------------------------------------

/// Upcast helper so boxed systems can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of logic run once per tick.
///
/// Lifecycle: [`initialize`](Self::initialize) once before the first update,
/// [`update`](Self::update) every tick while enabled, and
/// [`cleanup`](Self::cleanup) once at teardown. Systems reach entities and
/// components through the `World` they are handed.
pub trait System: AsAny {
    /// Unique name within a registry.
    fn name(&self) -> &str;

    /// Lower runs earlier. Read once at registration.
    fn priority(&self) -> i32 {
        0
    }

    fn initialize(&mut self, _world: &mut World) {}

    fn update(&mut self, world: &mut World, delta_time: f64);

    fn cleanup(&mut self, _world: &mut World) {}
}

fn downcast_ref<'a, T: System>(system: &'a (dyn System + 'static)) -> Option<&'a T> {
    system.as_any().downcast_ref::<T>()
}

fn downcast_mut<'a, T: System>(
    system: &'a mut (dyn System + 'static),
) -> Option<&'a mut T> {
    system.as_any_mut().downcast_mut::<T>()
}

// ---------------------------------------------------------------------------
// SystemTiming
// ---------------------------------------------------------------------------

/// Wall-clock time one system spent in its last `update`.
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub name: String,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// SystemRegistry
// ---------------------------------------------------------------------------

struct SystemEntry {
    name: String,
    priority: i32,
    enabled: bool,
    initialized: bool,
    system: Box<dyn System>,
}

/// Owns systems and runs them in priority order.
///
/// Sorting happens once, in [`initialize_all`](Self::initialize_all) (or the
/// first [`update_all`](Self::update_all) if that comes first). Changing a
/// priority afterwards has no effect until [`resort`](Self::resort) is called.
#[derive(Default)]
pub struct SystemRegistry {
    entries: Vec<SystemEntry>,
    sorted: bool,
    last_timings: Vec<SystemTiming>,
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("systems", &self.names())
            .field("sorted", &self.sorted)
            .finish()
    }
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `system` and return a handle to it.
    ///
    /// Once the registry is sorted, new systems are slotted in after every
    /// system of equal or lower priority.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`] if a system with the same name is
    /// already registered. The existing system is left untouched.
    pub fn register<T: System>(&mut self, system: T) -> Result<&mut T, EcsError> {
        let name = system.name().to_owned();
        if self.contains(&name) {
            tracing::warn!(system = %name, "rejected duplicate system registration");
            return Err(EcsError::DuplicateSystem { name });
        }
        let priority = system.priority();
        tracing::debug!(system = %name, priority, "registered system");

        let entry = SystemEntry {
            name,
            priority,
            enabled: true,
            initialized: false,
            system: Box::new(system),
        };
        let index = if self.sorted {
            let at = self.entries.partition_point(|e| e.priority <= priority);
            self.entries.insert(at, entry);
            at
        } else {
            self.entries.push(entry);
            self.entries.len() - 1
        };

        Ok(downcast_mut::<T>(self.entries[index].system.as_mut())
            .unwrap_or_else(|| unreachable!("freshly boxed system has its registered type")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&(dyn System + 'static)> {
        self.entry(name).map(|e| e.system.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn System + 'static)> {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(e) => Some(e.system.as_mut()),
            None => None,
        }
    }

    /// Look up a system by name and downcast it to `T`.
    pub fn get_as<T: System>(&self, name: &str) -> Option<&T> {
        downcast_ref::<T>(self.get(name)?)
    }

    pub fn get_as_mut<T: System>(&mut self, name: &str) -> Option<&mut T> {
        downcast_mut::<T>(self.get_mut(name)?)
    }

    /// Sort by priority (once), then initialize every enabled system that has
    /// not been initialized yet. Calling it again does nothing new.
    pub fn initialize_all(&mut self, world: &mut World) {
        if !self.sorted {
            self.resort();
        }
        for entry in self.entries.iter_mut().filter(|e| e.enabled) {
            if !entry.initialized {
                tracing::debug!(system = %entry.name, "initializing system");
                entry.system.initialize(world);
                entry.initialized = true;
            }
        }
    }

    /// Run `update` on every enabled system in the established order.
    ///
    /// A system that was disabled during `initialize_all` and enabled since
    /// gets initialized right before its first update.
    pub fn update_all(&mut self, world: &mut World, delta_time: f64) {
        if !self.sorted {
            self.resort();
        }
        self.last_timings.clear();
        for entry in self.entries.iter_mut().filter(|e| e.enabled) {
            if !entry.initialized {
                tracing::debug!(system = %entry.name, "initializing system");
                entry.system.initialize(world);
                entry.initialized = true;
            }
            let start = Instant::now();
            entry.system.update(world, delta_time);
            let elapsed = start.elapsed();
            tracing::trace!(system = %entry.name, ?elapsed, "system updated");
            self.last_timings.push(SystemTiming {
                name: entry.name.clone(),
                elapsed,
            });
        }
    }

    /// Run `cleanup` on every system, then drop them all.
    pub fn cleanup_all(&mut self, world: &mut World) {
        for entry in &mut self.entries {
            tracing::debug!(system = %entry.name, "cleaning up system");
            entry.system.cleanup(world);
        }
        self.entries.clear();
        self.last_timings.clear();
        self.sorted = false;
    }

    /// Returns `false` if no system has that name.
    pub fn enable(&mut self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Returns `false` if no system has that name.
    pub fn disable(&mut self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.entry(name).map(|e| e.enabled)
    }

    /// Change a priority. Takes effect at the next [`resort`](Self::resort).
    pub fn set_priority(&mut self, name: &str, priority: i32) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(e) => {
                e.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Stable sort by ascending priority.
    pub fn resort(&mut self) {
        self.entries.sort_by_key(|e| e.priority);
        self.sorted = true;
    }

    /// Names in the current execution order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-system timings from the most recent `update_all`.
    pub fn last_timings(&self) -> &[SystemTiming] {
        &self.last_timings
    }

    /// Move every system out of `other` into `self`, skipping names that are
    /// already taken here.
    pub(crate) fn absorb(&mut self, other: SystemRegistry) {
        for entry in other.entries {
            if self.contains(&entry.name) {
                tracing::warn!(
                    system = %entry.name,
                    "dropped duplicate system registered mid-tick"
                );
                continue;
            }
            if self.sorted {
                let at = self.entries.partition_point(|e| e.priority <= entry.priority);
                self.entries.insert(at, entry);
            } else {
                self.entries.push(entry);
            }
        }
    }

    fn entry(&self, name: &str) -> Option<&SystemEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(e) => {
                e.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
