//! Anchors/priors of Single Shot MultiBox Detectors (SSDs).
//!
//! SSD networks regress each box relative to a fixed reference point, its *anchor*. The anchors
//! can either be loaded from a text file with one `x,y` pair per line, or computed from a
//! description of the network's output layers.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    ops::Index,
    path::Path,
};

use crate::ConfigError;

/// An anchor of an SSD network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    // values range from 0 to 1
    x_center: f32,
    y_center: f32,
}

impl Anchor {
    pub fn new(x_center: f32, y_center: f32) -> Self {
        Self { x_center, y_center }
    }

    pub fn x_center(&self) -> f32 {
        self.x_center
    }

    pub fn y_center(&self) -> f32 {
        self.y_center
    }
}

/// Describes an output layer of an SSD network.
#[derive(Debug, Clone, Copy)]
pub struct LayerInfo {
    /// Number of anchors per feature map cell/pixel. Must be non-zero.
    boxes_per_cell: u32,
    width: u32,
    height: u32,
}

impl LayerInfo {
    /// Creates a new SSD layer description.
    ///
    /// # Parameters
    ///
    /// - `boxes_per_cell`: the number of boxes associated with each cell in this feature map.
    /// - `width`/`height`: size of this layer's feature map, in output cells.
    pub fn new(boxes_per_cell: u32, width: u32, height: u32) -> Self {
        assert_ne!(boxes_per_cell, 0);
        Self {
            boxes_per_cell,
            width,
            height,
        }
    }
}

/// The immutable list of anchors a network's predictions refer to.
///
/// There is exactly one anchor per prediction slot, in the order the network emits them.
#[derive(Debug, Clone)]
pub struct AnchorTable {
    anchors: Vec<Anchor>,
}

impl AnchorTable {
    /// Layers of the 192x192 palm detection network.
    pub const PALM_192_LAYERS: &'static [LayerInfo] = &[
        LayerInfo {
            boxes_per_cell: 2,
            width: 24,
            height: 24,
        },
        LayerInfo {
            boxes_per_cell: 6,
            width: 12,
            height: 12,
        },
    ];

    pub fn new(anchors: Vec<Anchor>) -> Self {
        Self { anchors }
    }

    /// Computes the anchors of an SSD network with the given output layers.
    ///
    /// Every anchor sits at the center of its feature map cell. Cells with several boxes get
    /// several identical anchors; the network tells them apart by regressing them differently.
    pub fn generate(layers: &[LayerInfo]) -> Self {
        let mut anchors = Vec::new();

        for layer in layers {
            for y in 0..layer.height {
                for x in 0..layer.width {
                    let x_center = (x as f32 + 0.5) / layer.width as f32;
                    let y_center = (y as f32 + 0.5) / layer.height as f32;
                    for _ in 0..layer.boxes_per_cell {
                        anchors.push(Anchor { x_center, y_center });
                    }
                }
            }
        }

        Self { anchors }
    }

    /// Returns the 2016 anchors of the 192x192 palm detection network.
    pub fn palm_192() -> Self {
        Self::generate(Self::PALM_192_LAYERS)
    }

    /// Parses an anchor list with one `x,y` pair per line.
    ///
    /// Empty lines are skipped. Any other line must consist of exactly two comma-separated
    /// floating point numbers.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Self::parse_lines(text.lines().map(Ok::<_, std::io::Error>), Path::new("<string>"))
    }

    /// Reads an anchor list from `reader`.
    ///
    /// See [`AnchorTable::parse`] for the format.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ConfigError> {
        Self::parse_lines(reader.lines(), Path::new("<reader>"))
    }

    fn parse_lines<S: AsRef<str>>(
        lines: impl Iterator<Item = std::io::Result<S>>,
        source_path: &Path,
    ) -> Result<Self, ConfigError> {
        let mut anchors = Vec::new();
        for (i, line) in lines.enumerate() {
            let line = line.map_err(|source| ConfigError::Io {
                path: source_path.to_path_buf(),
                source,
            })?;
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }

            let malformed = || ConfigError::MalformedAnchor {
                line: i + 1,
                content: line.to_string(),
            };

            let mut fields = line.split(',').map(|field| field.trim().parse::<f32>());
            match (fields.next(), fields.next(), fields.next()) {
                (Some(Ok(x)), Some(Ok(y)), None) => anchors.push(Anchor::new(x, y)),
                _ => return Err(malformed()),
            }
        }

        log::debug!("parsed {} anchors", anchors.len());
        Ok(Self { anchors })
    }

    /// Loads an anchor file from the filesystem.
    ///
    /// See [`AnchorTable::parse`] for the file format.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> Result<Self, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        Self::parse_lines(BufReader::new(file).lines(), path)
    }

    /// Returns the total number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.anchors.iter()
    }

    /// Checks that there is one anchor for each of `predictions` network outputs.
    pub fn check_count(&self, predictions: usize) -> Result<(), ConfigError> {
        if self.anchors.len() != predictions {
            return Err(ConfigError::AnchorCountMismatch {
                anchors: self.anchors.len(),
                predictions,
            });
        }
        Ok(())
    }
}

impl Index<usize> for AnchorTable {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Anchor {
        &self.anchors[index]
    }
}

impl<'a> IntoIterator for &'a AnchorTable {
    type Item = &'a Anchor;
    type IntoIter = std::slice::Iter<'a, Anchor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palm_anchor_layout() {
        let anchors = AnchorTable::palm_192();
        assert_eq!(anchors.len(), 2016);

        // 2 boxes per cell on the 24x24 layer
        assert_eq!(anchors[0], Anchor::new(0.5 / 24.0, 0.5 / 24.0));
        assert_eq!(anchors[1], anchors[0]);
        assert_eq!(anchors[2], Anchor::new(1.5 / 24.0, 0.5 / 24.0));

        // 6 boxes per cell on the 12x12 layer
        let first_coarse = 24 * 24 * 2;
        assert_eq!(anchors[first_coarse], Anchor::new(0.5 / 12.0, 0.5 / 12.0));
        assert_eq!(anchors[first_coarse + 5], anchors[first_coarse]);
        assert_eq!(anchors[first_coarse + 6], Anchor::new(1.5 / 12.0, 0.5 / 12.0));
        assert_eq!(anchors[2015], Anchor::new(11.5 / 12.0, 11.5 / 12.0));
    }

    #[test]
    fn parse_anchor_file() {
        let anchors = AnchorTable::parse("0.5,0.5\n 0.25 , 0.75\n\n1,0\n").unwrap();
        assert_eq!(anchors.len(), 3);
        assert_eq!(anchors[1], Anchor::new(0.25, 0.75));
        assert_eq!(anchors[2], Anchor::new(1.0, 0.0));

        assert!(AnchorTable::parse("").unwrap().is_empty());

        let from_reader = AnchorTable::from_reader("0.5,0.5\n0.25,0.75\n".as_bytes()).unwrap();
        assert_eq!(from_reader.len(), 2);
        assert_eq!(from_reader[1], Anchor::new(0.25, 0.75));
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        for (text, bad_line) in [
            ("0.5,0.5\n0.5\n", 2),
            ("0.5,0.5,0.5\n", 1),
            ("0.1,0.2\n\nabc,0.3\n", 3),
            ("0.1;0.2\n", 1),
            ("0.1,\n", 1),
        ] {
            match AnchorTable::parse(text) {
                Err(ConfigError::MalformedAnchor { line, .. }) => assert_eq!(line, bad_line, "{text:?}"),
                other => panic!("expected malformed anchor error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_missing_file() {
        let err = AnchorTable::load("/nonexistent/anchors.csv").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "{err}");
    }

    #[test]
    fn count_check() {
        let anchors = AnchorTable::parse("0.5,0.5\n0.1,0.1\n").unwrap();
        anchors.check_count(2).unwrap();
        assert!(matches!(
            anchors.check_count(2016),
            Err(ConfigError::AnchorCountMismatch {
                anchors: 2,
                predictions: 2016
            })
        ));
    }
}
