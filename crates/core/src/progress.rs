/// `round(100 * (step_index + fraction) / total_steps)`, clamped to `0..=100`.
pub fn step_progress(step_index: usize, fraction: f64, total_steps: usize) -> u8 {
    if total_steps == 0 {
        return 0;
    }
    let fraction = fraction.clamp(0.0, 1.0);
    let value = 100.0 * (step_index as f64 + fraction) / total_steps as f64;
    value.round().clamp(0.0, 100.0) as u8
}

/// Progress over every step's recorded completion.
///
/// Steps before `current` contribute their own completion instead of a flat 1.0, so the
/// result matches [`step_progress`] whenever those steps are complete. The value never
/// reaches 100 while any step is short of complete.
pub fn submission_progress(completion: &[f64], current: usize) -> u8 {
    if completion.is_empty() {
        return 0;
    }
    let current = current.min(completion.len() - 1);
    let done: f64 = completion[..=current].iter().map(|fraction| fraction.clamp(0.0, 1.0)).sum();
    let value = (100.0 * done / completion.len() as f64).round().clamp(0.0, 100.0) as u8;

    let all_complete = completion.iter().all(|fraction| *fraction >= 1.0);
    if all_complete {
        value
    } else {
        value.min(99)
    }
}

#[cfg(test)]
mod tests {
    use super::{step_progress, submission_progress};

    #[test]
    fn step_progress_matches_formula() {
        assert_eq!(step_progress(0, 0.0, 4), 0);
        assert_eq!(step_progress(1, 0.5, 4), 38);
        assert_eq!(step_progress(3, 1.0, 4), 100);
        assert_eq!(step_progress(2, 0.0, 0), 0);
    }

    #[test]
    fn fully_complete_form_reports_one_hundred() {
        assert_eq!(submission_progress(&[1.0, 1.0, 1.0], 2), 100);
    }

    #[test]
    fn any_incomplete_step_keeps_progress_below_one_hundred() {
        assert_eq!(submission_progress(&[1.0, 0.5, 1.0], 2), 83);
        let mut nearly_done = vec![1.0; 199];
        nearly_done.push(0.999);
        assert!(submission_progress(&nearly_done, 199) < 100);
    }

    #[test]
    fn agrees_with_step_formula_when_previous_steps_are_complete() {
        let completion = [1.0, 1.0, 0.25, 0.0, 0.0];
        assert_eq!(submission_progress(&completion, 2), step_progress(2, 0.25, 5));
    }

    #[test]
    fn empty_form_has_no_progress() {
        assert_eq!(submission_progress(&[], 0), 0);
    }
}
