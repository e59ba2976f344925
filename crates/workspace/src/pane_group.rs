//! Pane group for split pane layouts.
//!
//! A binary tree where leaves are windows showing a buffer and internal nodes
//! are splits. New panes always take the second slot of the split that
//! replaces their target.
//!
//! ```text
//! Split (Horizontal, 0.6)
//! ├── Leaf (window-1)
//! └── Split (Vertical, 0.5)
//!     ├── Leaf (window-2)
//!     └── Leaf (window-3)
//! ```
//!
//! `Horizontal` splits stack their children top to bottom and divide rows;
//! `Vertical` splits place them side by side and divide columns.

use terminal::{BufferId, Direction, WindowId};

/// Rows and columns assigned to a pane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaneSize {
    pub rows: u16,
    pub cols: u16,
}

impl PaneSize {
    pub fn along(&self, direction: Direction) -> u16 {
        match direction {
            Direction::Horizontal => self.rows,
            Direction::Vertical => self.cols,
        }
    }

    fn with(self, direction: Direction, extent: u16) -> Self {
        match direction {
            Direction::Horizontal => Self {
                rows: extent,
                ..self
            },
            Direction::Vertical => Self {
                cols: extent,
                ..self
            },
        }
    }

    /// Split along `direction`, giving the first part `ratio` of the room.
    fn divide(self, direction: Direction, ratio: f32) -> (Self, Self) {
        let available = self.along(direction);
        let first = if available < 2 {
            available
        } else {
            ((available as f32 * ratio).round() as u16).clamp(1, available - 1)
        };
        (
            self.with(direction, first),
            self.with(direction, available - first),
        )
    }
}

/// A pane group node: either a window (leaf) or a split with two children.
#[derive(Clone, Debug, PartialEq)]
pub enum PaneNode {
    Leaf {
        window: WindowId,
        buffer: BufferId,
    },
    Split {
        direction: Direction,
        first: Box<PaneNode>,
        second: Box<PaneNode>,
        /// Share of the first child (0.0 to 1.0)
        ratio: f32,
    },
}

enum ResizeSearch {
    NotFound,
    /// Target found, no split on the requested axis above it yet.
    Found,
    Done,
}

impl PaneNode {
    pub fn new_leaf(window: WindowId, buffer: BufferId) -> Self {
        Self::Leaf { window, buffer }
    }

    /// Split `target`, placing `new_window` in the second slot with
    /// `new_ratio` of the room.
    ///
    /// Returns false if the target wasn't found.
    pub fn split(
        &mut self,
        target: WindowId,
        direction: Direction,
        new_window: WindowId,
        buffer: BufferId,
        new_ratio: f32,
    ) -> bool {
        match self {
            PaneNode::Leaf { window, .. } if *window == target => {
                let old = self.clone();
                *self = PaneNode::Split {
                    direction,
                    first: Box::new(old),
                    second: Box::new(PaneNode::new_leaf(new_window, buffer)),
                    ratio: (1.0 - new_ratio).clamp(0.0, 1.0),
                };
                true
            }
            PaneNode::Leaf { .. } => false,
            PaneNode::Split { first, second, .. } => {
                first.split(target, direction, new_window, buffer, new_ratio)
                    || second.split(target, direction, new_window, buffer, new_ratio)
            }
        }
    }

    /// The first (topmost/leftmost) window in the tree.
    pub fn first_leaf(&self) -> WindowId {
        match self {
            PaneNode::Leaf { window, .. } => *window,
            PaneNode::Split { first, .. } => first.first_leaf(),
        }
    }

    /// Every window with its buffer, in layout order.
    pub fn leaves(&self) -> Vec<(WindowId, BufferId)> {
        match self {
            PaneNode::Leaf { window, buffer } => vec![(*window, *buffer)],
            PaneNode::Split { first, second, .. } => {
                let mut result = first.leaves();
                result.extend(second.leaves());
                result
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PaneNode::Leaf { .. })
    }

    pub fn contains(&self, target: WindowId) -> bool {
        self.buffer(target).is_some()
    }

    pub fn buffer(&self, target: WindowId) -> Option<BufferId> {
        match self {
            PaneNode::Leaf { window, buffer } => (*window == target).then_some(*buffer),
            PaneNode::Split { first, second, .. } => {
                first.buffer(target).or_else(|| second.buffer(target))
            }
        }
    }

    /// Show `buffer` in `target`. Returns false if the window wasn't found.
    pub fn set_buffer(&mut self, target: WindowId, new_buffer: BufferId) -> bool {
        match self {
            PaneNode::Leaf { window, buffer } if *window == target => {
                *buffer = new_buffer;
                true
            }
            PaneNode::Leaf { .. } => false,
            PaneNode::Split { first, second, .. } => {
                first.set_buffer(target, new_buffer) || second.set_buffer(target, new_buffer)
            }
        }
    }

    /// Removes a window from the tree.
    ///
    /// The parent split is replaced by the remaining sibling, promoting it up
    /// the tree. Returns the removed leaf, or `None` if the target wasn't found
    /// or is the root itself.
    pub fn remove(&mut self, target: WindowId) -> Option<PaneNode> {
        let PaneNode::Split { first, second, .. } = self else {
            return None;
        };

        let promote = if matches!(first.as_ref(), PaneNode::Leaf { window, .. } if *window == target)
        {
            Some((second.as_ref().clone(), first.as_ref().clone()))
        } else if matches!(second.as_ref(), PaneNode::Leaf { window, .. } if *window == target) {
            Some((first.as_ref().clone(), second.as_ref().clone()))
        } else {
            None
        };

        if let Some((sibling, removed)) = promote {
            *self = sibling;
            return Some(removed);
        }

        match self {
            PaneNode::Leaf { .. } => None,
            PaneNode::Split { first, second, .. } => {
                first.remove(target).or_else(|| second.remove(target))
            }
        }
    }

    /// Size of every window when the tree fills `size`, in layout order.
    pub fn layout(&self, size: PaneSize) -> Vec<(WindowId, PaneSize)> {
        match self {
            PaneNode::Leaf { window, .. } => vec![(*window, size)],
            PaneNode::Split {
                direction,
                first,
                second,
                ratio,
            } => {
                let (first_size, second_size) = size.divide(*direction, *ratio);
                let mut result = first.layout(first_size);
                result.extend(second.layout(second_size));
                result
            }
        }
    }

    /// Give `target` exactly `extent` cells along `direction` by moving the
    /// nearest enclosing split on that axis.
    ///
    /// Returns false if the window wasn't found or no split on that axis
    /// encloses it.
    pub fn resize(
        &mut self,
        target: WindowId,
        direction: Direction,
        extent: u16,
        size: PaneSize,
    ) -> bool {
        matches!(
            self.resize_inner(target, direction, extent, size),
            ResizeSearch::Done
        )
    }

    fn resize_inner(
        &mut self,
        target: WindowId,
        axis: Direction,
        extent: u16,
        size: PaneSize,
    ) -> ResizeSearch {
        match self {
            PaneNode::Leaf { window, .. } => {
                if *window == target {
                    ResizeSearch::Found
                } else {
                    ResizeSearch::NotFound
                }
            }
            PaneNode::Split {
                direction,
                first,
                second,
                ratio,
            } => {
                let (first_size, second_size) = size.divide(*direction, *ratio);
                let (in_first, result) = match first.resize_inner(target, axis, extent, first_size)
                {
                    ResizeSearch::NotFound => (
                        false,
                        second.resize_inner(target, axis, extent, second_size),
                    ),
                    found => (true, found),
                };

                match result {
                    ResizeSearch::Found if *direction == axis => {
                        let available = size.along(axis);
                        if available < 2 {
                            return ResizeSearch::Done;
                        }
                        let extent = extent.clamp(1, available - 1);
                        let share = extent as f32 / available as f32;
                        *ratio = if in_first { share } else { 1.0 - share };
                        ResizeSearch::Done
                    }
                    other => other,
                }
            }
        }
    }
}
