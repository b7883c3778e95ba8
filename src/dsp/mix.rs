//! Dry/wet mixing.

/*
Equal-Power Mixing
==================

A linear crossfade (dry * (1 - r) + wet * r) dips in perceived loudness in
the middle: two uncorrelated signals at 50% amplitude carry only half the
power of one signal at full level. The echo of a delay is largely
uncorrelated with the dry signal, so the dip is audible.

The equal-power law uses square-root gains instead:

    output = wet * sqrt(r) + dry * sqrt(1 - r)

    r = 0.5  →  both at ~0.707, power sums to 1.0

    gain
     1.0 ┤───╮            ╭───
         │    ╲          ╱
    0.71 ┤      ╲  ╱╲  ╱         dry = sqrt(1 - r)
         │        ╳             wet = sqrt(r)
         │      ╱   ╲
     0.0 ┤───╯        ╰───
         └─────────────────→ r
         0      0.5      1

At the two ends the square roots are not exactly 0 and 1 in floating point,
which would leak a trace of the other signal into a "pure" setting. The
ratio is therefore rounded to three decimals and the endpoints bypass the
multiply entirely.
*/

/// Round `ratio` to three decimals and report whether it sits on an end.
#[inline]
fn endpoint(ratio: f32) -> Option<bool> {
    let millis = (ratio * 1000.0).round();
    if millis <= 0.0 {
        Some(false)
    } else if millis >= 1000.0 {
        Some(true)
    } else {
        None
    }
}

/// Blend `wet` and `dry` with the equal-power law.
///
/// `ratio` 0.0 returns `dry` untouched, 1.0 returns `wet` untouched.
#[inline]
pub fn equal_power_mix(wet: f32, dry: f32, ratio: f32) -> f32 {
    match endpoint(ratio) {
        Some(false) => dry,
        Some(true) => wet,
        None => wet * ratio.sqrt() + dry * (1.0 - ratio).sqrt(),
    }
}

/// Equal-power blend of `wet` into `dry` in place.
pub fn equal_power_mix_in_place(dry: &mut [f32], wet: &[f32], ratio: f32) {
    debug_assert_eq!(dry.len(), wet.len());
    for (d, &w) in dry.iter_mut().zip(wet) {
        *d = equal_power_mix(w, *d, ratio);
    }
}
