//! Main image selection among full and reduced resolution directories

use super::ifd::Value;
use crate::directory::Directory;
use crate::tags::Tag;

/// Where a directory sits in the stream's directory tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectoryRef {
    /// Position in the IFD0 → IFD1 → … chain.
    Chain(usize),
    /// A SubIFD of the first chain directory, by position in its SubIFDs list.
    SubIfd(usize),
}

impl DirectoryRef {
    /// Group name used for tags of this directory, e.g. `IFD1` or `SubIFD0`.
    pub fn group(self) -> String {
        match self {
            DirectoryRef::Chain(i) => format!("IFD{}", i),
            DirectoryRef::SubIfd(i) => format!("SubIFD{}", i),
        }
    }
}

/// A directory with the attributes selection depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifiedDirectory {
    pub reference: DirectoryRef,
    /// SubfileType, zero when the tag is absent.
    pub subfile_type: u32,
    pub pixel_area: Option<u64>,
}

impl ClassifiedDirectory {
    /// Classify from already decoded SubfileType, ImageWidth and ImageLength values.
    pub fn new(
        reference: DirectoryRef,
        subfile_type: Option<&Value>,
        width: Option<&Value>,
        height: Option<&Value>,
    ) -> Self {
        // An absent or unreadable SubfileType means a full resolution image.
        let subfile_type = subfile_type.and_then(Value::as_u32).unwrap_or(0);
        let pixel_area = match (width.and_then(Value::as_u64), height.and_then(Value::as_u64)) {
            (Some(w), Some(h)) => w.checked_mul(h),
            _ => None,
        };

        ClassifiedDirectory {
            reference,
            subfile_type,
            pixel_area,
        }
    }

    /// A full resolution image. Pages, masks and other kinds do not qualify.
    pub fn is_full_resolution(&self) -> bool {
        self.subfile_type == 0
    }

    /// A declared reduced resolution version of another image.
    pub fn is_reduced(&self) -> bool {
        self.subfile_type == 1
    }

    fn area(&self) -> u64 {
        self.pixel_area.unwrap_or(0)
    }
}

/// Tags that feed [`ClassifiedDirectory`], for callers that decode lazily.
pub const CLASSIFYING_TAGS: [Tag; 3] = [Tag::SubfileType, Tag::ImageWidth, Tag::ImageLength];

/// The outcome of main image selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub main: DirectoryRef,
    /// Chain directories other than the main one, in chain order.
    pub previews: Vec<DirectoryRef>,
}

/// Pick the main image directory.
///
/// `chain` is the IFD chain in order and `sub_ifds` the SubIFDs of its first directory. Returns
/// `None` only for an empty chain. Ties always go to the earlier directory.
pub fn select(chain: &[ClassifiedDirectory], sub_ifds: &[ClassifiedDirectory]) -> Option<Selection> {
    let first = chain.first()?;

    let main = if first.is_reduced() {
        largest(sub_ifds.iter().filter(|d| d.is_full_resolution()))
            .or_else(|| chain[1..].iter().find(|d| d.is_full_resolution()))
            .or_else(|| chain.get(1))
            .unwrap_or(first)
    } else {
        let threshold = first.pixel_area.and_then(|a| a.checked_mul(2));
        let undeclared_preview = threshold.and_then(|threshold| {
            largest(
                chain[1..]
                    .iter()
                    .filter(|d| d.is_full_resolution() && d.pixel_area.map_or(false, |a| a > threshold)),
            )
        });

        undeclared_preview.unwrap_or(first)
    };

    let previews = chain
        .iter()
        .map(|d| d.reference)
        .filter(|r| *r != main.reference)
        .collect();

    Some(Selection {
        main: main.reference,
        previews,
    })
}

/// Directory with the largest area, the earliest one on ties.
fn largest<'a>(candidates: impl Iterator<Item = &'a ClassifiedDirectory>) -> Option<&'a ClassifiedDirectory> {
    candidates.fold(None, |best: Option<&ClassifiedDirectory>, d| match best {
        Some(b) if b.area() >= d.area() => Some(b),
        _ => Some(d),
    })
}

/// Classify `dir` with a decoder for single values.
pub(crate) fn classify_with(
    reference: DirectoryRef,
    dir: &Directory,
    mut value_of: impl FnMut(Tag) -> Option<Value>,
) -> ClassifiedDirectory {
    let [subfile, width, height] = CLASSIFYING_TAGS.map(|t| dir.get_tag(t).and_then(|_| value_of(t)));
    ClassifiedDirectory::new(reference, subfile.as_ref(), width.as_ref(), height.as_ref())
}
