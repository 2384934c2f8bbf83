//! Back-to-front ordering of transparent geometry.

/// Sorts `items` by descending squared distance, farthest first.
///
/// The sort is stable: items at equal distance keep their relative order.
pub fn sort_back_to_front<T>(items: &mut [T], distance2: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| distance2(b).total_cmp(&distance2(a)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_distances() {
        let mut distances = [9.0f32, 1.0, 25.0, 1.0];
        sort_back_to_front(&mut distances, |distance| *distance);
        assert_eq!(distances, [25.0, 9.0, 1.0, 1.0]);
    }

    #[test]
    fn test_equal_distances_keep_original_order() {
        let mut items = [("a", 1.0f32), ("b", 4.0), ("c", 1.0), ("d", 4.0)];
        sort_back_to_front(&mut items, |item| item.1);
        let names: Vec<_> = items.iter().map(|item| item.0).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }
}
