//! Slash-separated database paths. Empty segments are ignored, so `""` is the root and
//! `"/attendance/"` is the same as `"attendance"`.

pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub(crate) fn join(base: &str, child: &str) -> String {
    segments(base)
        .chain(segments(child))
        .collect::<Vec<_>>()
        .join("/")
}

/// True if one path is an ancestor of (or equal to) the other.
pub(crate) fn overlaps(a: &str, b: &str) -> bool {
    segments(a).zip(segments(b)).all(|(x, y)| x == y)
}
