use serde::{Deserialize, Serialize};

use super::Direction;

/// A straight drawn line between two grid points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PathSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        PathSegment { x1, y1, x2, y2 }
    }

    pub fn direction(&self) -> Option<Direction> {
        Direction::of_displacement(self.x2 - self.x1, self.y2 - self.y1)
    }

    /// True when `next` starts where `self` ends and heads the same way.
    pub fn is_continued_by(&self, next: &PathSegment) -> bool {
        next.x1 == self.x2
            && next.y1 == self.y2
            && self.direction().is_some()
            && Direction::of_displacement(next.x2 - self.x2, next.y2 - self.y2) == self.direction()
    }
}

/// Append `segments` to `path` in order, folding each one into the last
/// segment when it is a collinear continuation.
pub fn merge_path_segments(path: &mut Vec<PathSegment>, segments: impl IntoIterator<Item = PathSegment>) {
    for segment in segments {
        match path.last_mut() {
            Some(last) if last.is_continued_by(&segment) => {
                last.x2 = segment.x2;
                last.y2 = segment.y2;
            }
            _ => path.push(segment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_requires_shared_endpoint() {
        let a = PathSegment::new(1, 1, 2, 1);
        assert!(a.is_continued_by(&PathSegment::new(2, 1, 3, 1)));
        assert!(!a.is_continued_by(&PathSegment::new(3, 1, 4, 1)));
    }

    #[test]
    fn continuation_requires_same_direction() {
        let a = PathSegment::new(1, 1, 2, 2);
        assert!(a.is_continued_by(&PathSegment::new(2, 2, 4, 4)));
        assert!(!a.is_continued_by(&PathSegment::new(2, 2, 3, 2)));
        assert!(!a.is_continued_by(&PathSegment::new(2, 2, 1, 1)));
    }

    #[test]
    fn merge_into_empty_path_pushes() {
        let mut path = Vec::new();
        merge_path_segments(&mut path, [PathSegment::new(3, 3, 3, 2)]);
        assert_eq!(path, vec![PathSegment::new(3, 3, 3, 2)]);
    }

    #[test]
    fn merge_folds_every_continuation() {
        let mut path = vec![PathSegment::new(1, 5, 2, 5)];
        merge_path_segments(
            &mut path,
            [
                PathSegment::new(2, 5, 3, 5),
                PathSegment::new(3, 5, 3, 6),
                PathSegment::new(3, 6, 3, 8),
            ],
        );
        assert_eq!(
            path,
            vec![PathSegment::new(1, 5, 3, 5), PathSegment::new(3, 5, 3, 8)]
        );
    }

    #[test]
    fn degenerate_last_segment_is_never_extended() {
        let mut path = vec![PathSegment::new(2, 2, 2, 2)];
        merge_path_segments(&mut path, [PathSegment::new(2, 2, 3, 2)]);
        assert_eq!(path.len(), 2);
    }
}
