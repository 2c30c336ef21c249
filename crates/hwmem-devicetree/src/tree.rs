//! Live device tree scanning
//!
//! Walks the property tree the kernel exposes under `/proc/device-tree`
//! (one directory per node, one file per property) and collects every node
//! with a `compatible` list and a `reg` window, with the window translated
//! to a CPU physical address through the parents' `ranges`.

use crate::error::{DevicetreeError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Locations searched when no root is given
pub const DEFAULT_ROOTS: &[&str] = &["/proc/device-tree", "/sys/firmware/devicetree/base"];

/// `#address-cells` when a node does not specify it
const DEFAULT_ADDRESS_CELLS: usize = 2;
/// `#size-cells` when a node does not specify it
const DEFAULT_SIZE_CELLS: usize = 1;

/// A device node with a memory-mapped register window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtNode {
    /// Node name, e.g. `gpio@a0000000`
    pub name: String,
    /// Path from the tree root, e.g. `/amba/gpio@a0000000`
    pub path: String,
    /// Entries of the `compatible` property, in order
    pub compatible: Vec<String>,
    /// CPU physical address of the first `reg` entry
    pub base: u64,
    /// Size of the first `reg` entry
    pub size: u64,
}

/// One `ranges` entry: child address space to parent address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RangeEntry {
    child: u64,
    parent: u64,
    len: u64,
}

/// How a node maps its children's addresses into its own parent's space
#[derive(Debug, Clone, PartialEq, Eq)]
enum Ranges {
    /// The root; child addresses are CPU addresses
    Root,
    /// Empty `ranges`
    Identity,
    /// Explicit mapping
    Map(Vec<RangeEntry>),
    /// No `ranges`: children are not memory-mapped
    Missing,
}

/// Address layout a node imposes on its children
#[derive(Debug, Clone)]
struct Level {
    address_cells: usize,
    size_cells: usize,
    ranges: Ranges,
}

/// Find the device tree root among [`DEFAULT_ROOTS`]
pub fn default_root() -> Result<PathBuf> {
    DEFAULT_ROOTS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_dir())
        .ok_or_else(|| DevicetreeError::RootNotFound(DEFAULT_ROOTS.join(", ")))
}

/// Collect all memory-mapped device nodes below `root`
///
/// Nodes are returned depth-first with siblings in name order.
pub fn scan(root: &Path) -> Result<Vec<DtNode>> {
    if !root.is_dir() {
        return Err(DevicetreeError::RootNotFound(root.display().to_string()));
    }

    let mut nodes = Vec::new();
    let root_level = Level {
        address_cells: read_cells(root, "#address-cells")?.unwrap_or(DEFAULT_ADDRESS_CELLS),
        size_cells: read_cells(root, "#size-cells")?.unwrap_or(DEFAULT_SIZE_CELLS),
        ranges: Ranges::Root,
    };
    for (name, dir) in child_nodes(root)? {
        walk(&dir, &name, &format!("/{}", name), &mut vec![root_level.clone()], &mut nodes)?;
    }

    log::debug!("Device tree at {} has {} mapped nodes", root.display(), nodes.len());
    Ok(nodes)
}

fn walk(
    dir: &Path,
    name: &str,
    path: &str,
    ancestors: &mut Vec<Level>,
    nodes: &mut Vec<DtNode>,
) -> Result<()> {
    if let Some(status) = read_string(dir, "status")? {
        if status != "okay" && status != "ok" {
            log::debug!("Skipping {} (status {})", path, status);
            return Ok(());
        }
    }

    let Some(parent) = ancestors.last() else {
        return Ok(());
    };

    let compatible = read_string_list(dir, "compatible")?;
    if !compatible.is_empty() {
        if let Some((addr, size)) = read_first_reg(dir, parent)? {
            match translate(addr, ancestors) {
                Some(base) => nodes.push(DtNode {
                    name: name.to_string(),
                    path: path.to_string(),
                    compatible,
                    base,
                    size,
                }),
                None => log::debug!("Skipping {} (reg {:#x} is not CPU-addressable)", path, addr),
            }
        }
    }

    let level = Level {
        address_cells: read_cells(dir, "#address-cells")?.unwrap_or(DEFAULT_ADDRESS_CELLS),
        size_cells: read_cells(dir, "#size-cells")?.unwrap_or(DEFAULT_SIZE_CELLS),
        ranges: Ranges::Missing,
    };
    let ranges = read_ranges(dir, &level, parent)?;

    ancestors.push(Level { ranges, ..level });
    for (child, child_dir) in child_nodes(dir)? {
        walk(&child_dir, &child, &format!("{}/{}", path, child), ancestors, nodes)?;
    }
    ancestors.pop();

    Ok(())
}

/// Map an address in the innermost ancestor's child space to a CPU address
fn translate(addr: u64, ancestors: &[Level]) -> Option<u64> {
    let mut addr = addr;
    for level in ancestors.iter().rev() {
        match &level.ranges {
            Ranges::Root => return Some(addr),
            Ranges::Identity => {}
            Ranges::Missing => return None,
            Ranges::Map(entries) => {
                let entry = entries
                    .iter()
                    .find(|e| addr >= e.child && addr - e.child < e.len)?;
                addr = entry.parent.checked_add(addr - entry.child)?;
            }
        }
    }
    Some(addr)
}

/// Sub-directories of `dir` (child nodes), sorted by name
fn child_nodes(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let read_err = |source| DevicetreeError::ReadNode {
        path: dir.to_path_buf(),
        source,
    };

    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.file_type().map_err(read_err)?.is_dir() {
            children.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    children.sort();
    Ok(children)
}

/// Raw property bytes, `None` if the node lacks the property
fn read_property(dir: &Path, name: &str) -> Result<Option<Vec<u8>>> {
    let path = dir.join(name);
    match fs::read(&path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(DevicetreeError::ReadProperty { path, source }),
    }
}

/// NUL-separated string list property
fn read_string_list(dir: &Path, name: &str) -> Result<Vec<String>> {
    Ok(read_property(dir, name)?
        .map(|bytes| {
            bytes
                .split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect()
        })
        .unwrap_or_default())
}

fn read_string(dir: &Path, name: &str) -> Result<Option<String>> {
    Ok(read_string_list(dir, name)?.into_iter().next())
}

/// Big-endian 32-bit cells
fn read_u32_cells(dir: &Path, name: &str) -> Result<Option<Vec<u32>>> {
    let Some(bytes) = read_property(dir, name)? else {
        return Ok(None);
    };
    if bytes.len() % 4 != 0 {
        return Err(malformed(dir, name, format!("length {} is not a multiple of 4", bytes.len())));
    }
    Ok(Some(
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    ))
}

fn read_cells(dir: &Path, name: &str) -> Result<Option<usize>> {
    match read_u32_cells(dir, name)?.as_deref() {
        None => Ok(None),
        Some([n]) => Ok(Some(*n as usize)),
        Some(_) => Err(malformed(dir, name, "expected a single cell".to_string())),
    }
}

/// First `(address, size)` pair of `reg`, in the parent's address space
fn read_first_reg(dir: &Path, parent: &Level) -> Result<Option<(u64, u64)>> {
    let Some(cells) = read_u32_cells(dir, "reg")? else {
        return Ok(None);
    };
    let entry = parent.address_cells + parent.size_cells;
    if parent.address_cells == 0 || cells.len() < entry {
        return Ok(None);
    }
    let addr = combine(&cells[..parent.address_cells]);
    let size = combine(&cells[parent.address_cells..entry]);
    Ok(Some((addr, size)))
}

fn read_ranges(dir: &Path, level: &Level, parent: &Level) -> Result<Ranges> {
    let Some(cells) = read_u32_cells(dir, "ranges")? else {
        return Ok(Ranges::Missing);
    };
    if cells.is_empty() {
        return Ok(Ranges::Identity);
    }

    let (child_cells, parent_cells) = (level.address_cells, parent.address_cells);
    let entry = child_cells + parent_cells + level.size_cells;
    if entry == 0 || cells.len() % entry != 0 {
        return Err(malformed(
            dir,
            "ranges",
            format!("{} cells is not a multiple of {}", cells.len(), entry),
        ));
    }

    Ok(Ranges::Map(
        cells
            .chunks_exact(entry)
            .map(|c| RangeEntry {
                child: combine(&c[..child_cells]),
                parent: combine(&c[child_cells..child_cells + parent_cells]),
                len: combine(&c[child_cells + parent_cells..]),
            })
            .collect(),
    ))
}

/// Combine big-endian cells into one value, keeping the low 64 bits
fn combine(cells: &[u32]) -> u64 {
    cells
        .iter()
        .fold(0u64, |acc, &c| (acc << 32) | u64::from(c))
}

fn malformed(dir: &Path, name: &str, message: String) -> DevicetreeError {
    DevicetreeError::MalformedProperty {
        path: dir.join(name),
        message,
    }
}
