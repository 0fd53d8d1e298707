//! Property tests for edge detection and LED cycling.

use ledcycle_lib::debounce::EdgeDetector;
use ledcycle_lib::gpio::mock::MockGpio;
use ledcycle_lib::gpio::{Edge, Level, OutputMode};
use ledcycle_lib::led::{LedColor, LedSet};
use proptest::prelude::*;

fn level() -> impl Strategy<Value = Level> {
    prop_oneof![Just(Level::High), Just(Level::Low)]
}

proptest! {
    /// An edge is reported exactly when a sample differs from the one before
    /// it (the detector starts as if it had seen High).
    #[test]
    fn edge_iff_sample_changes(samples in proptest::collection::vec(level(), 0..64)) {
        let mut detector = EdgeDetector::default();
        let mut previous = Level::High;
        for sample in samples {
            let edge = detector.update(sample);
            if sample == previous {
                prop_assert_eq!(edge, None);
            } else {
                prop_assert_eq!(edge, Some(Edge::entering(sample)));
            }
            previous = sample;
        }
    }

    /// Whatever edges arrive, exactly one LED line is Low, and the lit color
    /// is the number of presses modulo three.
    #[test]
    fn one_led_lit_and_cycle_of_three(
        falling in proptest::collection::vec(any::<bool>(), 0..48),
    ) {
        let mut gpio = MockGpio::new();
        let pins = [8, 9, 10];
        let mut set = LedSet::open(&mut gpio, pins, OutputMode::PushPull).unwrap();
        let mut presses = 0usize;
        for is_press in falling {
            let edge = if is_press { Edge::Falling } else { Edge::Rising };
            set.on_edge(edge).unwrap();
            if is_press {
                presses += 1;
            }
            let lit: Vec<u32> = pins
                .iter()
                .copied()
                .filter(|&p| gpio.output_level(p) == Some(Level::Low))
                .collect();
            prop_assert_eq!(lit.len(), 1);
            prop_assert_eq!(set.current(), LedColor::from_index(presses));
            prop_assert_eq!(lit[0], pins[set.current().index()]);
        }
    }
}
