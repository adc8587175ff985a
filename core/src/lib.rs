#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Dustfield terrain engine.
//!
//! This crate defines the message surface that connects the host game, the
//! authoritative terrain world, and the pure pattern generators. Gameplay
//! code submits [`Command`] values describing desired mutations, the world
//! executes them through its `apply` entry point against a [`TerrainHost`],
//! and broadcasts [`Event`] values that visual layers react to.

pub mod config;
pub mod hex;
pub mod host;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use config::{ConfigError, TerrainConfig};
pub use host::{HeadlessHost, OverlapTag, TerrainHost, WorldRect};

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed so that disks and neighbour probes near the grid
/// edge can be expressed without wrapping; only in-bounds cells are stored.
/// Coordinates order row-major, matching grid iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    row: i32,
    column: i32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Six hex neighbours of the cell, ignoring grid bounds.
    #[must_use]
    pub fn neighbors(self) -> [GridCoord; hex::NEIGHBOR_COUNT] {
        hex::neighbors(self)
    }

    /// Hex distance to another cell.
    #[must_use]
    pub fn distance(self, other: GridCoord) -> u32 {
        hex::distance(self, other)
    }
}

/// Size of the terrain grid measured in cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    columns: u32,
    rows: u32,
}

impl GridDimensions {
    /// Creates a dimension descriptor.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the grid has no cells, i.e. the host has not sized it.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(0)
    }

    /// Reports whether the coordinate lies inside `[0, columns) × [0, rows)`.
    #[must_use]
    pub fn contains(&self, cell: GridCoord) -> bool {
        u32::try_from(cell.column()).map_or(false, |column| column < self.columns)
            && u32::try_from(cell.row()).map_or(false, |row| row < self.rows)
    }

    /// Row-major index of the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: GridCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Coordinate stored at the provided row-major index.
    #[must_use]
    pub fn coord(&self, index: usize) -> Option<GridCoord> {
        if index >= self.cell_count() {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let column = i32::try_from(index % width).ok()?;
        let row = i32::try_from(index / width).ok()?;
        Some(GridCoord::new(column, row))
    }

    /// Iterates every coordinate in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = GridCoord> {
        let columns = i32::try_from(self.columns).unwrap_or(0);
        let rows = i32::try_from(self.rows).unwrap_or(0);
        (0..rows).flat_map(move |row| (0..columns).map(move |column| GridCoord::new(column, row)))
    }
}

/// Lifecycle stage of a single terrain cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// Terrain is present and collides.
    Solid,
    /// Terrain is fading out; it no longer counts as solid.
    Clearing,
    /// No terrain.
    #[default]
    Empty,
    /// Eligible to regrow and waiting for the next rhythmic step.
    PendingRegrow,
    /// Growing back in with its collider still disabled.
    Regrowing,
}

/// Weak reference to a visual instance owned by the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(u32);

impl VisualHandle {
    /// Creates a handle from its numeric representation.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a keep-clear footprint owner such as a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(u32);

impl OwnerId {
    /// Creates a new owner identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Linear RGB colour with components in `0..=1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    /// Red component.
    pub red: f32,
    /// Green component.
    pub green: f32,
    /// Blue component.
    pub blue: f32,
}

impl Tint {
    /// Creates a new tint from its components.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Linear interpolation towards `other` by `t`.
    #[must_use]
    pub fn lerp(self, other: Tint, t: f32) -> Tint {
        Tint::new(
            self.red + (other.red - self.red) * t,
            self.green + (other.green - self.green) * t,
            self.blue + (other.blue - self.blue) * t,
        )
    }

    /// Largest per-component absolute difference to `other`.
    #[must_use]
    pub fn max_delta(self, other: Tint) -> f32 {
        (self.red - other.red)
            .abs()
            .max((self.green - other.green).abs())
            .max((self.blue - other.blue).abs())
    }

    /// Component-wise scaled copy.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Tint {
        Tint::new(self.red * factor, self.green * factor, self.blue * factor)
    }

    /// Component-wise sum.
    #[must_use]
    pub fn added(self, other: Tint) -> Tint {
        Tint::new(
            self.red + other.red,
            self.green + other.green,
            self.blue + other.blue,
        )
    }
}

/// Visual and healing hints a carving actor leaves behind in a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Imprint {
    /// Tint the regrown terrain starts with.
    pub tint: Tint,
    /// Tint of the regrown terrain's shadow.
    pub shadow_tint: Tint,
    /// Overrides the default regrow delay when present.
    pub regrow_delay: Option<Duration>,
    hardness: f32,
}

impl Imprint {
    /// Creates an imprint with the default regrow delay.
    #[must_use]
    pub fn new(tint: Tint, shadow_tint: Tint, hardness: f32) -> Self {
        Self {
            tint,
            shadow_tint,
            regrow_delay: None,
            hardness: if hardness.is_nan() {
                0.0
            } else {
                hardness.clamp(0.0, 1.0)
            },
        }
    }

    /// Strength of the imprint in `0..=1`.
    #[must_use]
    pub const fn hardness(&self) -> f32 {
        self.hardness
    }

    /// Returns a copy that overrides the regrow delay.
    #[must_use]
    pub fn with_regrow_delay(mut self, delay: Duration) -> Self {
        self.regrow_delay = Some(delay);
        self
    }
}

/// Musical phase the arena is currently playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Opening phase with organic cave-like terrain.
    Establish,
    /// Phase whose terrain is a braided maze.
    Evolve,
    /// Phase that rings the arena with chokepoints.
    Intensify,
    /// Sparse polka-dot terrain for breathing room.
    Release,
    /// Wandering brush strokes.
    Wildcard,
    /// Wide maze corridors bridging sections.
    Bridge,
    /// Dense cave fill.
    Pop,
}

impl Phase {
    /// Every phase in declaration order.
    pub const ALL: [Phase; 7] = [
        Phase::Establish,
        Phase::Evolve,
        Phase::Intensify,
        Phase::Release,
        Phase::Wildcard,
        Phase::Bridge,
        Phase::Pop,
    ];

    /// Stable label used when deriving generation seeds.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Establish => "establish",
            Self::Evolve => "evolve",
            Self::Intensify => "intensify",
            Self::Release => "release",
            Self::Wildcard => "wildcard",
            Self::Bridge => "bridge",
            Self::Pop => "pop",
        }
    }
}

/// Procedural algorithm used to lay out terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    /// Cellular automaton cave fill.
    CellularAutomaton,
    /// Depth-first carved maze walls.
    CarvedMaze,
    /// Breadth-first distance rings.
    RingChokepoints,
    /// Random-walk strokes.
    DrunkenStrokes,
    /// Periodic dot mask.
    PeriodicDots,
}

/// Horizontal run of solid cells merged into one collision piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowSpan {
    /// Row containing the run.
    pub row: i32,
    /// First column of the run.
    pub start_column: i32,
    /// Last column of the run, inclusive.
    pub end_column: i32,
}

impl RowSpan {
    /// Number of cells covered by the span.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(self.end_column - self.start_column + 1).unwrap_or(0)
    }

    /// Reports whether the span covers no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Commands that express all permissible terrain mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the frame clock; drives timers, spawning, flow and diffusion.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Fixed-timestep tick on which composite rebuilds execute.
    PhysicsTick,
    /// Clears the grid and lays out a fresh maze for the provided phase.
    GenerateMaze {
        /// Phase whose pattern should be generated.
        phase: Phase,
        /// Fixed anchors kept permanently clear and joined by tunnels.
        anchors: Vec<GridCoord>,
    },
    /// Clears a disk of terrain, recording an optional imprint.
    Carve {
        /// Centre of the disk.
        center: GridCoord,
        /// Hex radius of the disk; zero carves a single cell.
        radius: u32,
        /// Fade-out duration handed to visuals.
        fade: Duration,
        /// Hints stored for the regrowth of every cell in the disk.
        imprint: Option<Imprint>,
    },
    /// Requests that terrain regrow in a cell.
    RequestRegrow {
        /// Cell to regrow.
        cell: GridCoord,
        /// Overrides the imprint or default delay.
        delay: Option<Duration>,
        /// Restarts an in-flight timer instead of leaving it untouched.
        refresh: bool,
    },
    /// Reported by a visual once its fade-out animation finished.
    FadeFinished {
        /// Cell whose visual finished fading.
        cell: GridCoord,
    },
    /// Places or moves a vehicle's keep-clear footprint.
    UpdateVehicleFootprint {
        /// Vehicle owning the footprint.
        owner: OwnerId,
        /// World position of the vehicle.
        position: Vec2,
        /// Hex radius of the footprint.
        radius: u32,
        /// Clears terrain inside newly claimed cells.
        force_remove: bool,
    },
    /// Drops a vehicle's footprint entirely.
    ReleaseVehicleFootprint {
        /// Vehicle owning the footprint.
        owner: OwnerId,
    },
    /// Places, moves or extends the protected pocket.
    UpdateStarPocket {
        /// World position of the protected object.
        position: Vec2,
        /// Hex radius of the pocket.
        radius: u32,
        /// Clears terrain inside newly claimed cells.
        force_remove: bool,
        /// Restarts regrow timers of every affected cell.
        refresh: bool,
    },
    /// Drops the protected pocket.
    ReleaseStarPocket,
    /// Keeps a cell open for a limited time.
    HoldCell {
        /// Cell to hold open.
        cell: GridCoord,
        /// Duration of the hold.
        duration: Duration,
    },
    /// Adopts a visual that already exists in the scene as solid terrain.
    AdoptVisual {
        /// Cell the visual occupies.
        cell: GridCoord,
        /// Handle of the preexisting visual.
        visual: VisualHandle,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the frame clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// The grid was rebuilt for new host dimensions.
    GridResized {
        /// New dimensions.
        dimensions: GridDimensions,
    },
    /// The staggered spawn pass placed terrain in a cell.
    CellSpawned {
        /// Cell that became solid.
        cell: GridCoord,
        /// Visual to create for the cell.
        visual: VisualHandle,
        /// Grow-in animation length.
        grow_in: Duration,
    },
    /// Terrain started fading out; its collider must be detached.
    CellClearing {
        /// Cell being cleared.
        cell: GridCoord,
        /// Visual that should fade.
        visual: Option<VisualHandle>,
        /// Fade duration.
        fade: Duration,
    },
    /// A fade completed and the cell is empty.
    CellEmptied {
        /// Cell that became empty.
        cell: GridCoord,
    },
    /// Terrain was removed outright, without a fade.
    CellRetired {
        /// Cell that became empty.
        cell: GridCoord,
        /// Visual to discard, if any.
        visual: Option<VisualHandle>,
    },
    /// A cell passed its regrow delay and waits for a rhythmic step.
    RegrowEligible {
        /// Cell now pending.
        cell: GridCoord,
    },
    /// A cell started growing back with its collider disabled.
    CellRegrowing {
        /// Cell regrowing.
        cell: GridCoord,
        /// Visual spawned or reactivated for the cell.
        visual: VisualHandle,
        /// Grow-in animation length.
        grow_in: Duration,
        /// Imprint the visual should tint itself with.
        imprint: Option<Imprint>,
    },
    /// A regrowing cell was vetoed before settling and waits again.
    RegrowDeferred {
        /// Cell sent back to pending.
        cell: GridCoord,
        /// Visual that should hide again.
        visual: Option<VisualHandle>,
    },
    /// A cell finished regrowing; its collider is enabled.
    CellSolidified {
        /// Cell now solid.
        cell: GridCoord,
        /// Visual whose collider should be enabled.
        visual: VisualHandle,
    },
    /// Diffusion changed the tint of a solid cell.
    CellTinted {
        /// Cell whose tint changed.
        cell: GridCoord,
        /// Visual to recolour.
        visual: Option<VisualHandle>,
        /// New tint.
        tint: Tint,
    },
    /// The merged collision shape was rebuilt.
    CompositeRebuilt {
        /// Number of merged spans in the new shape.
        spans: usize,
        /// Number of solid cells covered.
        solid_cells: usize,
    },
    /// A keep-clear footprint changed.
    KeepClearChanged {
        /// Owner of the footprint, or `None` for the protected pocket.
        owner: Option<OwnerId>,
        /// Cells that left the footprint.
        released: Vec<GridCoord>,
        /// Cells that joined the footprint.
        claimed: Vec<GridCoord>,
    },
    /// A maze layout was generated and queued for spawning.
    MazeGenerated {
        /// Phase that was generated.
        phase: Phase,
        /// Algorithm used for the layout.
        pattern: PatternKind,
        /// Number of cells queued for spawning.
        walls: usize,
        /// Number of cells dug out by tunnels.
        corridors: usize,
    },
    /// A tunnel between two anchors got boxed in before reaching its target.
    TunnelAborted {
        /// Anchor the tunnel started from.
        from: GridCoord,
        /// Anchor the tunnel was heading to.
        to: GridCoord,
        /// Last cell the tunnel reached.
        reached: GridCoord,
    },
    /// The staggered spawn pass drained its queue.
    SpawnPassCompleted {
        /// Number of cells spawned by the pass.
        spawned: usize,
    },
}
