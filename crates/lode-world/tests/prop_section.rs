use lode_blocks::BlockState;
use lode_world::{BlockPosition, Section, affected_sections};
use proptest::prelude::*;

proptest! {
    // idx is a bijection onto 0..4096
    #[test]
    fn section_idx_in_range(x in 0usize..16, y in 0usize..16, z in 0usize..16) {
        let i = Section::idx(x, y, z);
        prop_assert!(i < 4096);
        prop_assert_eq!(i % 16, x);
        prop_assert_eq!((i / 16) % 16, z);
        prop_assert_eq!(i / 256, y);
    }

    #[test]
    fn non_air_count_matches_contents(cells in proptest::collection::vec((0usize..16, 0usize..16, 0usize..16, 0u16..4), 0..200)) {
        let mut s = Section::new();
        for (x, y, z, id) in cells {
            s.set(x, y, z, BlockState::of(id));
        }
        let expected = s.blocks().iter().filter(|b| !b.is_air()).count();
        prop_assert_eq!(s.non_air_count(), expected);
        prop_assert_eq!(s.is_empty(), expected == 0);
        if let Some((min, max)) = s.bounds() {
            for a in 0..3 {
                prop_assert!(min[a] < max[a]);
                prop_assert!(max[a] <= 16);
            }
        }
    }

    // The owning section always comes first and neighbors are adjacent
    #[test]
    fn affected_sections_are_adjacent(x in -100i32..100, y in -64i32..320, z in -100i32..100) {
        let p = BlockPosition::new(x, y, z);
        let s = affected_sections(p);
        prop_assert_eq!(s[0], p.section_position());
        prop_assert!(s.len() <= 4);
        for n in &s[1..] {
            let d = (n.chunk.x - s[0].chunk.x).abs()
                + (n.chunk.z - s[0].chunk.z).abs()
                + (n.height - s[0].height).abs();
            prop_assert_eq!(d, 1);
        }
    }
}
