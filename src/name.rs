//! Domain names and labels.
//!
//! DNS compares names case-insensitively, and mDNS responders on a link get
//! to disagree about capitalization, so [`Label`] equality, ordering, and
//! hashing all ignore ASCII case. Everything that matches record names
//! against question names or service maps relies on this.

use std::{
    cmp::Ordering,
    fmt::{self, Write},
    hash::{Hash, Hasher},
    str::FromStr,
};

use crate::Error;

/// A `.`-separated component of a [`DomainName`].
///
/// Labels consist of arbitrary bytes and have a maximum length of 63 bytes.
/// This type can only represent non-empty labels.
#[derive(Clone)]
pub struct Label {
    // Guaranteed to contain >0 and at most `Label::MAX_LEN` bytes.
    bytes: Box<[u8]>,
}

impl Label {
    /// The maximum length of a domain label.
    pub const MAX_LEN: usize = 63;

    /// Creates a [`Label`] from raw bytes or a string slice, panicking if the
    /// bytes are not a valid label.
    ///
    /// # Panics
    ///
    /// This function will panic if `bytes` is empty or contains more than
    /// [`Self::MAX_LEN`] bytes.
    pub fn new(label: impl AsRef<[u8]>) -> Self {
        let label = label.as_ref();
        Self::try_new(label)
            .unwrap_or_else(|_| panic!("`Label::new` called with invalid data: {:?}", label))
    }

    /// Creates a [`Label`] from raw bytes or a string slice.
    pub fn try_new(label: impl AsRef<[u8]>) -> Result<Self, Error> {
        let label = label.as_ref();
        if label.is_empty() {
            return Err(Error::InvalidEmptyLabel);
        }
        if label.len() > Self::MAX_LEN {
            return Err(Error::LabelTooLong);
        }

        Ok(Self {
            bytes: label.into(),
        })
    }

    /// Returns the raw bytes of this label.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the label as a string, replacing invalid UTF-8.
    pub fn to_utf8(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.eq_ignore_ascii_case(&other.bytes)
    }
}

impl Eq for Label {}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.bytes.iter().map(u8::to_ascii_lowercase);
        let rhs = other.bytes.iter().map(u8::to_ascii_lowercase);
        lhs.cmp(rhs)
    }
}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.len().hash(state);
        for byte in self.bytes.iter() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#""{}""#, self.as_bytes().escape_ascii())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_bytes().escape_ascii().fmt(f)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

/// A domain name, represented as a list of [`Label`]s.
///
/// In DNS messages, domain names are terminated by an empty root label; this
/// type omits it, so names can be built up incrementally with
/// [`DomainName::push_label`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainName {
    labels: Vec<Label>,
}

impl DomainName {
    /// The empty root domain `.`.
    pub const ROOT: Self = Self { labels: Vec::new() };

    /// Parses a domain name as a string of `.`-separated labels.
    ///
    /// A trailing `.` is allowed but not required. This is the same operation
    /// as the [`FromStr`] impl, without requiring the trait import.
    pub fn from_str(s: &str) -> Result<Self, Error> {
        s.parse()
    }

    /// Returns the `.`-separated labels making up this domain name.
    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Returns the leading label, if the name is non-empty.
    #[inline]
    pub fn first_label(&self) -> Option<&Label> {
        self.labels.first()
    }

    /// Appends a [`Label`] to the end of this domain name.
    #[inline]
    pub fn push_label(&mut self, label: Label) {
        self.labels.push(label);
    }
}

impl Extend<Label> for DomainName {
    fn extend<T: IntoIterator<Item = Label>>(&mut self, iter: T) {
        self.labels.extend(iter)
    }
}

impl<'a> Extend<&'a Label> for DomainName {
    fn extend<T: IntoIterator<Item = &'a Label>>(&mut self, iter: T) {
        self.labels.extend(iter.into_iter().cloned())
    }
}

impl FromIterator<Label> for DomainName {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Self {
            labels: Vec::from_iter(iter),
        }
    }
}

impl<'a> FromIterator<&'a Label> for DomainName {
    fn from_iter<T: IntoIterator<Item = &'a Label>>(iter: T) -> Self {
        Self {
            labels: iter.into_iter().cloned().collect(),
        }
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#""{}""#, self)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_char('.');
        }
        for (i, label) in self.labels.iter().enumerate() {
            if i != 0 {
                f.write_char('.')?;
            }
            label.fmt(f)?;
        }
        Ok(())
    }
}

impl FromStr for DomainName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            // `split_terminator` returns an empty label for this, so special-case it
            return Ok(Self::ROOT);
        }

        let mut name = DomainName { labels: Vec::new() };
        for label in s.split_terminator('.') {
            name.labels.push(label.parse()?);
        }
        Ok(name)
    }
}
