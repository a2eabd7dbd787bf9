/// Maps raw region spellings onto a fixed list of canonical names.
#[derive(Debug, Clone)]
pub struct RegionNormalizer {
    references: Vec<Vec<char>>,
    names: Vec<String>,
    cutoff: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub canonical: String,
    pub ratio: Option<f64>,
}

impl RegionNormalizer {
    pub fn new<I, S>(references: I, cutoff: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = references
            .into_iter()
            .map(|name| name.as_ref().to_uppercase())
            .collect();
        Self {
            references: names.iter().map(|name| name.chars().collect()).collect(),
            names,
            cutoff,
        }
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.normalize_detailed(raw).canonical
    }

    /// Like `normalize`, also returning the winning ratio when a reference was accepted.
    pub fn normalize_detailed(&self, raw: &str) -> Normalized {
        let upper = raw.to_uppercase();
        let input: Vec<char> = upper.chars().collect();

        let mut best: Option<(usize, f64)> = None;
        for (index, reference) in self.references.iter().enumerate() {
            let total = reference.len() + input.len();
            if total > 0 {
                let bound = 2.0 * reference.len().min(input.len()) as f64 / total as f64;
                if bound < self.cutoff {
                    continue;
                }
            }

            let score = ratio(reference, &input);
            if score < self.cutoff {
                continue;
            }
            // strict comparison keeps the earliest reference on ties
            if best.map_or(true, |(_, current)| score > current) {
                best = Some((index, score));
            }
        }

        match best {
            Some((index, score)) => Normalized {
                canonical: self.names[index].clone(),
                ratio: Some(score),
            },
            None => Normalized {
                canonical: upper,
                ratio: None,
            },
        }
    }

    pub fn references(&self) -> &[String] {
        &self.names
    }
}

/// Ratcliff/Obershelp similarity: `2 * matched / (len(a) + len(b))`.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(a, b) as f64 / total as f64
}

/// Sum of matching block sizes, found by repeatedly taking the longest
/// common run and recursing on both sides of it.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common run in `a[alo..ahi]` and `b[blo..bhi]`; ties go to the
/// earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo;
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            if a[i] == b[j] {
                let run = previous[slot - 1] + 1;
                current[slot] = run;
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            } else {
                current[slot] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    (best_i, best_j, best_size)
}
