use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::Index;
use strum::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Lowest `width` bytes of `value` in this byte order
    pub fn bytes(self, value: u64, width: usize) -> Vec<u8> {
        let le = value.to_le_bytes();
        let mut bytes: Vec<u8> = le.iter().take(width).copied().collect();
        bytes.resize(width, 0);
        if self == Endian::Big {
            bytes.reverse();
        }
        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum RegionKind {
    Ram,
    #[default]
    Rom,
}

/// Fill used when a region is aligned at emission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Padding {
    Value(u64),
    Text(String),
}

impl Padding {
    /// Fill pattern; numbers use their minimal width of 1, 2, 4 or 8 bytes
    pub fn pattern(&self, endian: Endian) -> Vec<u8> {
        match self {
            Padding::Value(v) => {
                let width = match *v {
                    0..=0xFF => 1,
                    0x100..=0xFFFF => 2,
                    0x1_0000..=0xFFFF_FFFF => 4,
                    _ => 8,
                };
                endian.bytes(*v, width)
            }
            Padding::Text(s) => s.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Region {region} overflow: {requested} more byte(s) with {used} of {max} used")]
pub struct RegionOverflow {
    pub region: usize,
    pub requested: usize,
    pub used: usize,
    pub max: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub kind: RegionKind,
    pub origin: Option<u64>,
    pub max_size: Option<usize>,
    pub padding: Option<Padding>,
    pub alignment: Option<usize>,
    pub content: Vec<u8>,
}

impl Region {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Remaining capacity, `None` when unbounded
    pub fn free(&self) -> Option<usize> {
        self.max_size.map(|max| max.saturating_sub(self.len()))
    }

    /// Address of the next appended byte when the origin is known
    pub fn cursor(&self) -> Option<u64> {
        self.origin.map(|org| org + self.len() as u64)
    }
}

/// Index into the region list, either by position or by tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRef<'a> {
    Index(usize),
    Tag(&'a str),
}

impl From<usize> for RegionRef<'_> {
    fn from(idx: usize) -> Self {
        RegionRef::Index(idx)
    }
}

impl<'a> From<&'a str> for RegionRef<'a> {
    fn from(tag: &'a str) -> Self {
        RegionRef::Tag(tag)
    }
}

/// Ordered memory regions with tags and layout hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    regions: Vec<Region>,
    tags: IndexMap<String, usize>,
    current: usize,
    pub endian: Endian,
    /// Default maximum size of banks opened without one
    pub bank_size: Option<usize>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(Endian::default())
    }
}

impl Memory {
    pub fn new(endian: Endian) -> Self {
        Memory {
            regions: vec![Region::default()],
            tags: IndexMap::new(),
            current: 0,
            endian,
            bank_size: None,
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn tags(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tags.iter().map(|(name, &idx)| (name.as_str(), idx))
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_region(&self) -> &Region {
        &self.regions[self.current]
    }

    pub fn get<'a>(&self, region: impl Into<RegionRef<'a>>) -> Option<&Region> {
        self.resolve(region.into()).map(|idx| &self.regions[idx])
    }

    fn resolve(&self, region: RegionRef) -> Option<usize> {
        match region {
            RegionRef::Index(idx) => (idx < self.regions.len()).then_some(idx),
            RegionRef::Tag(tag) => self.tags.get(tag).copied(),
        }
    }

    /// Open a region after all existing ones and make it current
    pub fn new_region(
        &mut self,
        kind: RegionKind,
        origin: Option<u64>,
        max_size: Option<usize>,
        padding: Option<Padding>,
    ) -> usize {
        self.regions.push(Region {
            kind,
            origin,
            max_size,
            padding,
            ..Region::default()
        });
        self.current = self.regions.len() - 1;
        log::debug!(
            "region {}: {kind} origin={origin:?} max_size={max_size:?}",
            self.current
        );
        self.current
    }

    /// Bind `name` to the current region. Existing tags are never rebound.
    pub fn tag(&mut self, name: &str) -> bool {
        if self.tags.contains_key(name) {
            return false;
        }
        self.tags.insert(name.to_string(), self.current);
        true
    }

    /// Make a tagged region current
    pub fn select(&mut self, name: &str) -> bool {
        match self.tags.get(name) {
            Some(&idx) => {
                self.current = idx;
                true
            }
            None => false,
        }
    }

    /// Append bytes, returning their offset within the region
    pub fn append_bytes(&mut self, region: usize, bytes: &[u8]) -> Result<usize, RegionOverflow> {
        let r = &mut self.regions[region];
        if let Some(max) = r.max_size {
            if r.len() + bytes.len() > max {
                return Err(RegionOverflow {
                    region,
                    requested: bytes.len(),
                    used: r.len(),
                    max,
                });
            }
        }
        let offset = r.len();
        r.content.extend_from_slice(bytes);
        Ok(offset)
    }

    pub fn set_alignment(&mut self, region: usize, n: usize) {
        self.regions[region].alignment = Some(n);
    }

    pub fn set_padding(&mut self, region: usize, padding: Padding) {
        self.regions[region].padding = Some(padding);
    }

    /// Region content with its end padded up to the alignment
    pub fn emit(&self, region: usize) -> Vec<u8> {
        let r = &self.regions[region];
        let mut bytes = r.content.clone();
        let Some(align) = r.alignment.filter(|&n| n > 1) else {
            return bytes;
        };
        let target = bytes.len().div_ceil(align) * align;
        let pattern = match &r.padding {
            Some(p) => p.pattern(self.endian),
            None => vec![0],
        };
        let pattern = if pattern.is_empty() { vec![0] } else { pattern };
        let fill = pattern.iter().cycle().take(target - bytes.len()).copied();
        bytes.extend(fill.collect::<Vec<_>>());
        bytes
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Index<usize> for Memory {
    type Output = Region;

    fn index(&self, idx: usize) -> &Region {
        &self.regions[idx]
    }
}

impl Index<&str> for Memory {
    type Output = Region;

    fn index(&self, tag: &str) -> &Region {
        &self.regions[self.tags[tag]]
    }
}
