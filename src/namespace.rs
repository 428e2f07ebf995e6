use std::collections::btree_map::{self, BTreeMap};

use crate::decoder::container::ContainerKind;
use crate::decoder::ifd::Value;
use crate::decoder::makernote::vendor::is_maker_note_group;
use crate::decoder::stream::ByteOrder;

/// The flat result of a read: `Group:Name` keys, plus unprefixed keys for the main image.
///
/// Keys are unique and iterate in sorted order. A key is never replaced once set; the order in
/// which directories are merged is the precedence order.
#[derive(Clone, Debug, PartialEq)]
pub struct TagNamespace {
    tags: BTreeMap<String, Value>,
    byte_order: ByteOrder,
    container: ContainerKind,
    main_image: Option<String>,
}

impl TagNamespace {
    pub(crate) fn new(byte_order: ByteOrder, container: ContainerKind) -> Self {
        TagNamespace {
            tags: BTreeMap::new(),
            byte_order,
            container,
            main_image: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.tags.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    /// Iterate over all tags, sorted by key.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.tags.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Byte order of the primary TIFF stream.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn container(&self) -> ContainerKind {
        self.container
    }

    /// Group of the directory chosen as the main image, e.g. `IFD0` or `SubIFD1`.
    pub fn main_image(&self) -> Option<&str> {
        self.main_image.as_deref()
    }

    /// Insert unless `key` is already present. Returns whether the value was stored.
    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) -> bool {
        match self.tags.entry(key.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub(crate) fn insert_grouped(&mut self, group: &str, name: &str, value: Value) -> bool {
        self.insert(format!("{}:{}", group, name), value)
    }

    pub(crate) fn set_main_image(&mut self, group: String) {
        self.main_image = Some(group);
    }

    /// Merge the tags of a secondary stream of the same file.
    ///
    /// Keys only the secondary stream has are added. Keys of MakerNote groups are taken from the
    /// secondary stream even when present, everything else stays as it is.
    pub(crate) fn overlay_secondary(&mut self, secondary: TagNamespace) {
        for (key, value) in secondary.tags {
            let maker_note = key
                .split_once(':')
                .map_or(false, |(group, _)| is_maker_note_group(group));

            if maker_note {
                self.tags.insert(key, value);
            } else {
                self.tags.entry(key).or_insert(value);
            }
        }
    }
}

/// Iterator over the tags of a [`TagNamespace`].
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, Value>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a TagNamespace {
    type Item = (&'a str, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
