use crate::constants::MIN_BOUNDARY_OFFSET;

/// Split extracted text into overlapping, sentence-aligned segments.
///
/// Texts that fit inside one window are returned whole. Longer texts are cut
/// by sliding a window of `size` characters; a window prefers to end at the
/// last sentence terminator or line break it contains, as long as that
/// boundary sits at least [`MIN_BOUNDARY_OFFSET`] characters past the window
/// start. The next window begins `overlap` characters before the previous cut
/// so no boundary-adjacent context is lost. Whitespace-only segments are
/// dropped. Order always follows the input.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() || size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total <= size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < total {
        let window_end = (start + size).min(total);
        let end = if window_end < total {
            find_boundary(&chars, start, window_end)
        } else {
            window_end
        };

        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }

        if end >= total {
            break;
        }

        let step = (end - start).saturating_sub(overlap).max(1);
        start += step;
    }

    chunks
}

/// Index one past the last sentence terminator or line break inside the
/// window, or the window end when no boundary lies far enough in.
fn find_boundary(chars: &[char], start: usize, window_end: usize) -> usize {
    let min_end = start + MIN_BOUNDARY_OFFSET;
    for i in (min_end.max(start)..window_end).rev() {
        let c = chars[i - 1];
        if c == '\n' || c == '.' || c == '!' || c == '?' {
            return i;
        }
    }
    window_end
}
