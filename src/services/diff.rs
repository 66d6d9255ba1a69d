//! # Diff 엔진
//!
//! 정규화된 두 텍스트를 granularity(character / word / line / sentence)별로 토큰화하고
//! Myers의 선형 공간 O(ND) 알고리즘으로 최소 편집 스크립트를 계산합니다.
//!
//! ## 재구성(reconstruction) 속성
//! 모든 호출에서 다음이 성립합니다:
//! - add가 아닌 세그먼트의 `content`를 이어 붙이면 A가 됩니다.
//! - remove가 아닌 세그먼트의 `modified_text()`를 이어 붙이면 B가 됩니다.
//!
//! 토큰은 항상 원본 텍스트의 슬라이스이고, 비교에는 옵션이 적용된 "키"만 사용합니다.
//! 그래서 ignore_case / ignore_whitespace에서도 세그먼트 내용은 원문 그대로입니다.
//!
//! ## 흐름
//! ```text
//! text ─ tokenize ─▶ [&str] ─ token_key ─▶ [u32] ─ Myers ─▶ [Edit] ─ build_segments ─▶ [Segment]
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::{Index, IndexMut, Range};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::models::{ComparisonOptions, DiffView, DiffViews, Granularity, Operation, Segment};

/// 크기/시간 가드 위반. 조용히 품질을 떨어뜨리는 대신 빠르게 실패합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("input of {bytes} bytes exceeds the {limit} byte comparison limit")]
    TooLarge { bytes: usize, limit: usize },
    #[error("diff computation exceeded its time budget after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffLimits {
    pub max_input_bytes: Option<usize>,
    pub timeout: Option<Duration>,
}

impl DiffLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn check_size(&self, text: &str) -> Result<(), DiffError> {
        match self.max_input_bytes {
            Some(limit) if text.len() > limit => Err(DiffError::TooLarge {
                bytes: text.len(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// 시간 가드. 시작 시각과 마감 시각을 함께 들고 다닙니다.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    started: Instant,
    at: Option<Instant>,
}

impl Deadline {
    fn new(timeout: Option<Duration>) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: timeout.map(|t| started + t),
        }
    }

    fn check(&self) -> Result<(), DiffError> {
        match self.at {
            Some(at) if Instant::now() >= at => Err(DiffError::Timeout {
                elapsed_ms: self.started.elapsed().as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}

/// 가드 없이 diff를 계산합니다. 잘 구성된 문자열 입력에 대해 실패하지 않습니다.
pub fn diff(
    text_a: &str,
    text_b: &str,
    granularity: Granularity,
    options: &ComparisonOptions,
) -> Vec<Segment> {
    match diff_with_deadline(text_a, text_b, granularity, options, Deadline::new(None)) {
        Ok(segments) => segments,
        Err(err) => unreachable!("diff without a deadline cannot fail: {err}"),
    }
}

/// 네 granularity 전부를 하나의 시간 예산 안에서 계산합니다.
pub fn diff_all(
    text_a: &str,
    text_b: &str,
    options: &ComparisonOptions,
    limits: &DiffLimits,
) -> Result<DiffViews, DiffError> {
    limits.check_size(text_a)?;
    limits.check_size(text_b)?;

    let deadline = Deadline::new(limits.timeout);
    let view = |granularity| -> Result<DiffView, DiffError> {
        let started = Instant::now();
        let segments = diff_with_deadline(text_a, text_b, granularity, options, deadline)?;
        tracing::debug!(
            %granularity,
            segments = segments.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "diff view computed"
        );
        Ok(DiffView {
            granularity,
            segments,
        })
    };

    Ok(DiffViews {
        character: view(Granularity::Character)?,
        word: view(Granularity::Word)?,
        line: view(Granularity::Line)?,
        sentence: view(Granularity::Sentence)?,
    })
}

fn diff_with_deadline<'t>(
    text_a: &'t str,
    text_b: &'t str,
    granularity: Granularity,
    options: &ComparisonOptions,
    deadline: Deadline,
) -> Result<Vec<Segment>, DiffError> {
    let old_tokens = tokenize(text_a, granularity, options);
    let new_tokens = tokenize(text_b, granularity, options);

    // 키를 정수로 바꿔 두면 Myers 루프의 비교가 u32 비교가 됩니다.
    let mut interned: HashMap<Cow<'t, str>, u32> = HashMap::new();
    let mut intern = |tokens: &[&'t str]| -> Vec<u32> {
        tokens
            .iter()
            .map(|&token| {
                let next = interned.len() as u32;
                *interned.entry(token_key(token, options)).or_insert(next)
            })
            .collect()
    };
    let old_ids = intern(&old_tokens);
    let new_ids = intern(&new_tokens);

    let edits = myers(&old_ids, &new_ids, deadline)?;
    Ok(build_segments(&old_tokens, &new_tokens, &edits, granularity))
}

/// add가 아닌 세그먼트로 A를 재구성합니다.
pub fn reconstruct_original(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter(|s| s.operation != Operation::Add)
        .map(|s| s.content.as_str())
        .collect()
}

/// remove가 아닌 세그먼트로 B를 재구성합니다.
pub fn reconstruct_modified(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter(|s| s.operation != Operation::Remove)
        .map(Segment::modified_text)
        .collect()
}

// ── 토큰화 ──

/// 텍스트를 granularity 단위 토큰으로 나눕니다. 토큰을 이어 붙이면 항상 원문이 됩니다.
pub fn tokenize<'a>(
    text: &'a str,
    granularity: Granularity,
    options: &ComparisonOptions,
) -> Vec<&'a str> {
    match granularity {
        Granularity::Character => tokenize_chars(text, options.ignore_whitespace),
        Granularity::Word => tokenize_words(text),
        Granularity::Line => text.split_inclusive('\n').collect(),
        Granularity::Sentence => tokenize_sentences(text),
    }
}

/// 유니코드 스칼라 단위. ignore_whitespace이면 공백 연속 구간을 한 토큰으로 묶어
/// "공백 한 칸으로 축약" 비교가 가능하게 합니다.
fn tokenize_chars(text: &str, group_whitespace: bool) -> Vec<&str> {
    let mut tokens = Vec::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let mut end = start + c.len_utf8();
        if group_whitespace && c.is_whitespace() {
            while let Some(&(i, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
        }
        tokens.push(&text[start..end]);
    }
    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// 단어 토큰: 단어 문자의 최대 연속 구간(단어 내부의 아포스트로피 포함),
/// 공백의 최대 연속 구간, 그리고 구두점 한 글자씩.
fn tokenize_words(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |i: usize| chars.get(i).map_or(text.len(), |&(b, _)| b);
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i].1;
        let mut j = i + 1;
        if is_word_char(c) {
            while j < chars.len() {
                let next = chars[j].1;
                let joins_word = matches!(next, '\'' | '’')
                    && chars.get(j + 1).is_some_and(|&(_, after)| is_word_char(after));
                if is_word_char(next) {
                    j += 1;
                } else if joins_word {
                    j += 2;
                } else {
                    break;
                }
            }
        } else if c.is_whitespace() {
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
        }
        tokens.push(&text[byte_at(i)..byte_at(j)]);
        i = j;
    }
    tokens
}

/// 문장 토큰: `.`/`!`/`?` 뒤에 공백이나 텍스트 끝이 오면 문장이 끝납니다.
/// 문장 사이의 공백은 별도 토큰입니다.
fn tokenize_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if pos == start && c.is_whitespace() {
            let mut j = i;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            let end = chars.get(j).map_or(text.len(), |&(b, _)| b);
            tokens.push(&text[start..end]);
            start = end;
            i = j;
            continue;
        }
        if matches!(c, '.' | '!' | '?') {
            let ends_sentence = chars.get(i + 1).map_or(true, |&(_, next)| next.is_whitespace());
            if ends_sentence {
                let end = pos + c.len_utf8();
                tokens.push(&text[start..end]);
                start = end;
            }
        }
        i += 1;
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// 비교용 키. 원문 토큰은 그대로 두고 키에만 옵션을 적용합니다.
fn token_key<'a>(token: &'a str, options: &ComparisonOptions) -> Cow<'a, str> {
    let mut key = Cow::Borrowed(token);
    if options.ignore_whitespace && token.chars().any(char::is_whitespace) {
        key = Cow::Owned(collapse_whitespace(token));
    }
    if options.ignore_case && key.chars().any(|c| c.to_lowercase().ne(std::iter::once(c))) {
        key = Cow::Owned(key.to_lowercase());
    }
    key
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// 세그먼트의 token_count에 포함되는 토큰인지. word 단위에서는 공백 토큰을 세지 않습니다.
fn is_counted(token: &str, granularity: Granularity) -> bool {
    granularity != Granularity::Word || !token.chars().all(char::is_whitespace)
}

// ── Myers 선형 공간 diff ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal { old: usize, new: usize, len: usize },
    Delete { old: usize, len: usize },
    Insert { new: usize, len: usize },
}

/// 음수 대각선 k를 인덱스로 쓰기 위한 오프셋 배열
struct V {
    offset: isize,
    v: Vec<usize>,
}

impl V {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            v: vec![0; 2 * max_d + 1],
        }
    }
}

impl Index<isize> for V {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.v[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for V {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.v[(k + self.offset) as usize]
    }
}

fn max_d(old_len: usize, new_len: usize) -> usize {
    (old_len + new_len + 1) / 2 + 1
}

fn myers(old: &[u32], new: &[u32], deadline: Deadline) -> Result<Vec<Edit>, DiffError> {
    let max_d = max_d(old.len(), new.len());
    let mut state = Myers {
        old,
        new,
        vf: V::new(max_d),
        vb: V::new(max_d),
        deadline,
        edits: Vec::new(),
    };
    state.conquer(0..old.len(), 0..new.len())?;
    Ok(state.edits)
}

struct Myers<'a> {
    old: &'a [u32],
    new: &'a [u32],
    vf: V,
    vb: V,
    deadline: Deadline,
    edits: Vec<Edit>,
}

impl Myers<'_> {
    fn common_prefix_len(&self, old: Range<usize>, new: Range<usize>) -> usize {
        self.old[old]
            .iter()
            .zip(&self.new[new])
            .take_while(|(a, b)| a == b)
            .count()
    }

    fn common_suffix_len(&self, old: Range<usize>, new: Range<usize>) -> usize {
        self.old[old]
            .iter()
            .rev()
            .zip(self.new[new].iter().rev())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// 분할 정복. 공통 접두/접미를 먼저 떼어 낸 뒤 가운데 snake에서 둘로 나눕니다.
    fn conquer(&mut self, mut old: Range<usize>, mut new: Range<usize>) -> Result<(), DiffError> {
        let prefix = self.common_prefix_len(old.clone(), new.clone());
        if prefix > 0 {
            self.edits.push(Edit::Equal {
                old: old.start,
                new: new.start,
                len: prefix,
            });
        }
        old.start += prefix;
        new.start += prefix;

        let suffix = self.common_suffix_len(old.clone(), new.clone());
        old.end -= suffix;
        new.end -= suffix;

        if old.is_empty() && new.is_empty() {
            // 남은 편집 없음
        } else if new.is_empty() {
            self.edits.push(Edit::Delete {
                old: old.start,
                len: old.len(),
            });
        } else if old.is_empty() {
            self.edits.push(Edit::Insert {
                new: new.start,
                len: new.len(),
            });
        } else {
            let (x, y) = self.find_middle_snake(old.clone(), new.clone())?;
            self.conquer(old.start..x, new.start..y)?;
            self.conquer(x..old.end, y..new.end)?;
        }

        if suffix > 0 {
            self.edits.push(Edit::Equal {
                old: old.end,
                new: new.end,
                len: suffix,
            });
        }
        Ok(())
    }

    /// 전방/후방 탐색이 만나는 가운데 snake의 시작점을 찾습니다.
    /// 두 범위 모두 비어 있지 않아야 합니다.
    fn find_middle_snake(
        &mut self,
        old: Range<usize>,
        new: Range<usize>,
    ) -> Result<(usize, usize), DiffError> {
        let n = old.len();
        let m = new.len();
        // 최적 편집 거리 D는 delta와 홀짝이 같습니다.
        let delta = n as isize - m as isize;
        let odd = delta & 1 == 1;

        self.vf[1] = 0;
        self.vb[1] = 0;

        let d_max = max_d(n, m) as isize;
        for d in 0..d_max {
            self.deadline.check()?;

            // 전방 탐색
            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && self.vf[k - 1] < self.vf[k + 1]) {
                    self.vf[k + 1]
                } else {
                    self.vf[k - 1] + 1
                };
                let y = (x as isize - k) as usize;
                let (x0, y0) = (x, y);
                if x < n && y < m {
                    x += self.common_prefix_len(old.start + x..old.end, new.start + y..new.end);
                }
                self.vf[k] = x;

                if odd && (k - delta).abs() <= d - 1 && self.vf[k] + self.vb[-(k - delta)] >= n {
                    return Ok((old.start + x0, new.start + y0));
                }
            }

            // 후방 탐색
            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && self.vb[k - 1] < self.vb[k + 1]) {
                    self.vb[k + 1]
                } else {
                    self.vb[k - 1] + 1
                };
                let mut y = (x as isize - k) as usize;
                if x < n && y < m {
                    let advance = self.common_suffix_len(
                        old.start..old.start + n - x,
                        new.start..new.start + m - y,
                    );
                    x += advance;
                    y += advance;
                }
                self.vb[k] = x;

                if !odd && (k - delta).abs() <= d && self.vb[k] + self.vf[-(k - delta)] >= n {
                    return Ok((old.start + n - x, new.start + m - y));
                }
            }
        }

        // 최적 경로는 항상 d_max 안에서 만나므로 여기까지 오지 않습니다.
        Err(DiffError::Timeout {
            elapsed_ms: self.deadline.started.elapsed().as_millis() as u64,
        })
    }
}

// ── 세그먼트 조립 ──

#[derive(Default)]
struct Run {
    content: String,
    modified: String,
    tokens: usize,
}

impl Run {
    fn is_empty(&self) -> bool {
        self.content.is_empty() && self.modified.is_empty()
    }
}

/// 편집 스크립트를 세그먼트로 묶습니다. 두 equal 구간 사이의 변경은
/// remove 하나 다음 add 하나로 정규화합니다.
fn build_segments(
    old_tokens: &[&str],
    new_tokens: &[&str],
    edits: &[Edit],
    granularity: Granularity,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut equal = Run::default();
    let mut removed = Run::default();
    let mut added = Run::default();

    let count = |tokens: &[&str]| tokens.iter().filter(|t| is_counted(t, granularity)).count();

    for edit in edits {
        match *edit {
            Edit::Equal { old, new, len } => {
                flush_changes(&mut segments, &mut removed, &mut added);
                let old_slice = &old_tokens[old..old + len];
                equal.content.extend(old_slice.iter().copied());
                equal
                    .modified
                    .extend(new_tokens[new..new + len].iter().copied());
                equal.tokens += count(old_slice);
            }
            Edit::Delete { old, len } => {
                flush_equal(&mut segments, &mut equal);
                let slice = &old_tokens[old..old + len];
                removed.content.extend(slice.iter().copied());
                removed.tokens += count(slice);
            }
            Edit::Insert { new, len } => {
                flush_equal(&mut segments, &mut equal);
                let slice = &new_tokens[new..new + len];
                added.content.extend(slice.iter().copied());
                added.tokens += count(slice);
            }
        }
    }
    flush_equal(&mut segments, &mut equal);
    flush_changes(&mut segments, &mut removed, &mut added);
    segments
}

fn flush_equal(segments: &mut Vec<Segment>, equal: &mut Run) {
    if equal.is_empty() {
        return;
    }
    let run = std::mem::take(equal);
    let modified_content = (run.modified != run.content).then_some(run.modified);
    segments.push(Segment {
        operation: Operation::Equal,
        length: run.content.chars().count(),
        content: run.content,
        token_count: run.tokens,
        modified_content,
    });
}

fn flush_changes(segments: &mut Vec<Segment>, removed: &mut Run, added: &mut Run) {
    for (operation, run) in [(Operation::Remove, removed), (Operation::Add, added)] {
        if run.is_empty() {
            continue;
        }
        let run = std::mem::take(run);
        segments.push(Segment {
            operation,
            length: run.content.chars().count(),
            content: run.content,
            token_count: run.tokens,
            modified_content: None,
        });
    }
}
