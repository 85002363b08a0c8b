//! Handle temperature from the handle NTC thermistor.

/// ADC code and temperature (0.1 °C) pairs of the handle NTC divider, ascending by code.
const NTC_LOOKUP: [(i32, i32); 13] = [
    (11292, 600),
    (12782, 550),
    (14380, 500),
    (16061, 450),
    (17793, 400),
    (19541, 350),
    (21261, 300),
    (22915, 250),
    (24465, 200),
    (25882, 150),
    (27146, 100),
    (28249, 50),
    (29189, 0),
];

/// Interpolate between `(x1, y1)` and `(x2, y2)` at `x`, with a resolution of 1/1000.
fn interpolate((x1, y1): (i32, i32), (x2, y2): (i32, i32), x: i32) -> i32 {
    if x1 == x2 {
        return y1;
    }

    y1 + ((x - x1) * 1000 / (x2 - x1)) * (y2 - y1) / 1000
}

/// Look up `x` in a table sorted by ascending x.
///
/// Readings outside of the table are extrapolated from the first or last segment.
fn interpolate_lookup(table: &[(i32, i32)], x: i32) -> i32 {
    match table {
        [] => 0,
        [(_, y)] => *y,
        _ => {
            let upper = table[1..table.len() - 1]
                .iter()
                .position(|&(code, _)| x < code)
                .map_or(table.len() - 1, |index| index + 1);

            interpolate(table[upper - 1], table[upper], x)
        }
    }
}

/// The handle temperature in 0.1 °C for a raw handle ADC reading.
pub fn handle_temperature_x10(adc: u16) -> i32 {
    interpolate_lookup(&NTC_LOOKUP, adc as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_points_are_exact() {
        for (code, temperature_x10) in NTC_LOOKUP {
            assert_eq!(handle_temperature_x10(code as u16), temperature_x10);
        }
    }

    #[test]
    fn interpolates_between_points() {
        // Halfway between 22915 (25.0 °C) and 24465 (20.0 °C).
        assert_eq!(handle_temperature_x10(23690), 225);
    }

    #[test]
    fn extrapolates_outside_table() {
        assert!(handle_temperature_x10(10000) > 600);
        assert!(handle_temperature_x10(30000) < 0);
    }
}
