//! hwmem-bus - Bus backend registry
//!
//! This crate opens a bus backend from a descriptor string and hides the concrete
//! backend types from the CLI, which only ever sees `Box<dyn Bus>`.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              CLI (bin/hwmem)                 │
//! │  - select / parse / dispatch (hwmem-core)    │
//! └──────────────────────────────────────────────┘
//!                       │ open_bus("devicetree")
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │            hwmem-bus (this crate)            │
//! └──────────────────────────────────────────────┘
//!              │                     │
//!              ▼                     ▼
//! ┌────────────────────────┐ ┌───────────────────┐
//! │ hwmem-devicetree       │ │ hwmem-dummy       │
//! │ /proc/device-tree +    │ │ in-memory devices │
//! │ /dev/mem               │ │ from a RON file   │
//! └────────────────────────┘ └───────────────────┘
//! ```
//!
//! Descriptor format: `"name"` or `"name:key1=value1,key2=value2"`.

mod registry;

pub use registry::{
    available_buses, bus_help, bus_names_short, open_bus, parse_bus_params, BusInfo, BusParams,
    DEFAULT_BUS,
};

pub use hwmem_core::{Bus, Device};
