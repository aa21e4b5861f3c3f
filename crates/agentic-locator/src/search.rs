//! Best-first search over segment feature inclusions.
//!
//! Two priority queues drive the search. The exploration queue holds partial
//! [`Trial`]s ordered by cost; the finished queue holds inclusion records whose
//! loose and strict expressions both resolve to a single node. Both queues
//! break cost ties by insertion order, so a search is a pure function of the
//! document and the number of dequeues it was allowed.
//!
//! A trial walks its segments from the target towards the root. On each
//! segment it decides, one feature at a time, whether to assert the segment,
//! its identifier, sibling index, input name and each class name. Every
//! decision forks an "assert" and a "skip" successor; features the segment
//! does not have are stepped over without forking.
//!
//! A unique trial is a finished candidate and is not expanded, unless its
//! current segment is still bare: giving that segment a feature is the one
//! move that lowers cost.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::bitset::BitSet;
use crate::budget::FIXED_OPTIONS;
use crate::compiler::{compile, BitLayout};
use crate::document::DocumentQuery;
use crate::oracle;
use crate::scheduler::{Scheduler, StopReason};
use crate::types::{CompileMode, Locator, Segment};

/// Asserted segment with no other feature.
pub const BARE_SEGMENT_COST: u32 = 10;
/// Asserted segment that carries at least one feature.
pub const USED_SEGMENT_COST: u32 = 1;
pub const IDENTIFIER_COST: u32 = 2;
pub const INPUT_NAME_COST: u32 = 2;
pub const SIBLING_INDEX_COST: u32 = 10;
pub const CLASS_NAME_COST: u32 = 4;

/// Cheapest feature a bare segment can acquire.
const CHEAPEST_FEATURE_COST: u32 = 2;

/// Cost of asserting a class name. Longer names are more likely to be
/// semantic and are discounted.
pub fn class_name_cost(class: &str) -> u32 {
    let len = class.chars().count();
    if len > 10 {
        CLASS_NAME_COST - 2
    } else if len > 5 {
        CLASS_NAME_COST - 1
    } else {
        CLASS_NAME_COST
    }
}

/// A partial assignment of feature inclusions.
///
/// `cost` always equals the cost of the expression `includes` compiles to.
/// `bare` is set while the current segment is asserted without any feature.
#[derive(Debug, Clone)]
struct Trial {
    segment: usize,
    progress: usize,
    includes: BitSet,
    cost: u32,
    bare: bool,
    needs_check: bool,
}

impl Trial {
    /// Lowest cost any descendant of this trial can reach.
    fn lower_bound(&self) -> u32 {
        if self.bare {
            self.cost
                .saturating_sub(BARE_SEGMENT_COST - USED_SEGMENT_COST - CHEAPEST_FEATURE_COST)
        } else {
            self.cost
        }
    }
}

/// Heap entry: lowest cost first, then earliest insertion.
struct Queued<T> {
    cost: u32,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Queued<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}

impl<T> Eq for Queued<T> {}

impl<T> PartialOrd for Queued<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Queued<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

enum Decision {
    /// Fork on asserting the segment itself.
    UseSegment,
    /// Fork on asserting a feature bit.
    Feature { bit: usize, cost: u32 },
    /// Nothing to decide at this progress.
    Advance,
    /// Move on to the parent segment.
    SegmentDone,
}

/// Counters reported with every search outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Trials dequeued.
    pub explored: usize,
    /// Oracle evaluations.
    pub checked: usize,
    /// Unique candidates found.
    pub finished: usize,
    /// Trials discarded by the cost bound.
    pub pruned: usize,
    pub elapsed_ms: u64,
    pub stop_reason: StopReason,
}

/// Result of a completed, timed-out or cancelled search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Cheapest unique candidate in strict form.
    pub locator: Option<Locator>,
    pub stats: SearchStats,
}

/// Best-first search over one segment list.
pub struct SearchEngine<'a, D: ?Sized> {
    doc: &'a D,
    segments: &'a [Segment],
    layout: BitLayout,
    frontier: BinaryHeap<Queued<Trial>>,
    finished: BinaryHeap<Queued<BitSet>>,
    seq: u64,
    best: Option<u32>,
    explored: usize,
    checked: usize,
    pruned: usize,
    started: Instant,
}

impl<'a, D: DocumentQuery + ?Sized> SearchEngine<'a, D> {
    /// Seed the search with the target segment asserted.
    ///
    /// An empty segment list produces an engine that is already exhausted.
    pub fn new(doc: &'a D, segments: &'a [Segment]) -> Self {
        let layout = BitLayout::for_segments(segments);
        let mut engine = Self {
            doc,
            segments,
            layout,
            frontier: BinaryHeap::new(),
            finished: BinaryHeap::new(),
            seq: 0,
            best: None,
            explored: 0,
            checked: 0,
            pruned: 0,
            started: Instant::now(),
        };

        if let Some(target) = segments.len().checked_sub(1) {
            let mut includes = layout.empty();
            includes.set(layout.use_bit(target), true);
            engine.push_trial(Trial {
                segment: target,
                progress: 1,
                includes,
                cost: BARE_SEGMENT_COST,
                bare: true,
                needs_check: true,
            });
        }
        engine
    }

    /// Cost of the cheapest unique candidate found so far.
    pub fn best_cost(&self) -> Option<u32> {
        self.best
    }

    /// Trials waiting in the exploration queue.
    pub fn pending(&self) -> usize {
        self.frontier.len()
    }

    /// Run up to `max_dequeues` dequeues. Returns `true` once the exploration
    /// queue is empty.
    pub fn step(&mut self, max_dequeues: usize) -> bool {
        for _ in 0..max_dequeues {
            let Some(Queued { item: trial, .. }) = self.frontier.pop() else {
                return true;
            };
            self.explored += 1;

            if self.is_dominated(&trial) {
                self.pruned += 1;
                continue;
            }

            if trial.needs_check {
                self.checked += 1;
                if let Some(expression) = self.unique_expression(&trial.includes) {
                    tracing::trace!("Unique candidate {expression} (cost {})", trial.cost);
                    let bare = trial.bare;
                    self.record_finished(trial.clone());
                    if !bare {
                        continue;
                    }
                }
            }

            for next in self.successors(trial) {
                self.push_trial(next);
            }
        }
        self.frontier.is_empty()
    }

    /// One batch of dequeues followed by a checkpoint. Returns why the
    /// search must stop, if it must.
    pub fn advance<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) -> Option<StopReason> {
        if self.step(scheduler.yield_every().max(1)) {
            return Some(StopReason::Exhausted);
        }
        scheduler.checkpoint()
    }

    /// Drive the search to completion under `scheduler`.
    pub fn run<S: Scheduler + ?Sized>(mut self, scheduler: &mut S) -> SearchOutcome {
        let reason = loop {
            if let Some(reason) = self.advance(scheduler) {
                break reason;
            }
        };
        self.finish(reason)
    }

    /// Like [`run`](Self::run), awaiting `yield_now` after every checkpoint
    /// so an async host can run other tasks between batches.
    pub async fn run_yielding<S, F, Fut>(
        mut self,
        scheduler: &mut S,
        mut yield_now: F,
    ) -> SearchOutcome
    where
        S: Scheduler + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let reason = loop {
            if let Some(reason) = self.advance(scheduler) {
                break reason;
            }
            yield_now().await;
        };
        self.finish(reason)
    }

    /// Stop searching and recompile the cheapest finished candidate strictly.
    ///
    /// Candidates whose strict form no longer resolves to a single node are
    /// skipped in favour of the next cheapest.
    pub fn finish(mut self, stop_reason: StopReason) -> SearchOutcome {
        let finished = self.finished.len();
        let mut locator = None;
        while let Some(Queued { cost, item, .. }) = self.finished.pop() {
            let expression = compile(self.segments, &item, CompileMode::Strict);
            if oracle::is_unique(self.doc, &expression) {
                locator = Some(Locator { expression, cost });
                break;
            }
            tracing::debug!("Strict form of candidate is not unique: {expression}");
        }

        let stats = SearchStats {
            explored: self.explored,
            checked: self.checked,
            finished,
            pruned: self.pruned,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            stop_reason,
        };
        tracing::debug!(
            "Search stopped ({:?}) after {} trials, {} candidates, {} pruned: {:?}",
            stats.stop_reason,
            stats.explored,
            stats.finished,
            stats.pruned,
            locator.as_ref().map(|l: &Locator| l.expression.as_str())
        );

        SearchOutcome { locator, stats }
    }

    /// The loose expression for `includes` if it is unique and its strict
    /// form is too. A candidate only the loose form isolates must not set
    /// the pruning bound, since `finish` would have to discard it.
    fn unique_expression(&self, includes: &BitSet) -> Option<String> {
        let loose = compile(self.segments, includes, CompileMode::Loose);
        if !oracle::is_unique(self.doc, &loose) {
            return None;
        }
        let strict = compile(self.segments, includes, CompileMode::Strict);
        if strict != loose && !oracle::is_unique(self.doc, &strict) {
            tracing::debug!("Loose candidate {loose} is unique but {strict} is not");
            return None;
        }
        Some(loose)
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn is_dominated(&self, trial: &Trial) -> bool {
        self.best.is_some_and(|best| trial.lower_bound() >= best)
    }

    fn push_trial(&mut self, trial: Trial) {
        if self.is_dominated(&trial) {
            self.pruned += 1;
            return;
        }
        let seq = self.next_seq();
        self.frontier.push(Queued {
            cost: trial.cost,
            seq,
            item: trial,
        });
    }

    fn record_finished(&mut self, trial: Trial) {
        if self.best.map_or(true, |best| trial.cost < best) {
            self.best = Some(trial.cost);
        }
        let seq = self.next_seq();
        self.finished.push(Queued {
            cost: trial.cost,
            seq,
            item: trial.includes,
        });
    }

    fn decision(&self, trial: &Trial) -> Decision {
        let i = trial.segment;
        let segment = &self.segments[i];
        let layout = &self.layout;
        match trial.progress {
            0 => Decision::UseSegment,
            1 if !trial.includes.get(layout.use_bit(i)) => Decision::SegmentDone,
            1 if segment.identifier.is_some() => Decision::Feature {
                bit: layout.identifier_bit(i),
                cost: IDENTIFIER_COST,
            },
            2 if trial.includes.get(layout.identifier_bit(i)) => Decision::SegmentDone,
            2 if segment.sibling_index.is_some() => Decision::Feature {
                bit: layout.sibling_bit(i),
                cost: SIBLING_INDEX_COST,
            },
            3 if segment.input_name.is_some() => Decision::Feature {
                bit: layout.input_bit(i),
                cost: INPUT_NAME_COST,
            },
            1..=3 => Decision::Advance,
            p => match segment.classes().get(p - FIXED_OPTIONS) {
                Some(class) => Decision::Feature {
                    bit: layout.class_bit(i, p - FIXED_OPTIONS),
                    cost: class_name_cost(class),
                },
                None => Decision::SegmentDone,
            },
        }
    }

    /// Advance `trial` to its next decision and fork it there.
    fn successors(&self, mut trial: Trial) -> Vec<Trial> {
        loop {
            match self.decision(&trial) {
                Decision::Advance => trial.progress += 1,
                Decision::SegmentDone => {
                    if trial.segment == 0 {
                        return Vec::new();
                    }
                    trial.segment -= 1;
                    trial.progress = 0;
                    trial.bare = false;
                }
                Decision::UseSegment => {
                    let mut with = trial.clone();
                    with.includes.set(self.layout.use_bit(trial.segment), true);
                    with.cost += BARE_SEGMENT_COST;
                    with.bare = true;
                    return Self::fork(with, trial);
                }
                Decision::Feature { bit, cost } => {
                    let mut with = trial.clone();
                    with.includes.set(bit, true);
                    if with.bare {
                        with.cost = with.cost - BARE_SEGMENT_COST + USED_SEGMENT_COST;
                        with.bare = false;
                    }
                    with.cost += cost;
                    return Self::fork(with, trial);
                }
            }
        }
    }

    fn fork(mut with: Trial, mut without: Trial) -> Vec<Trial> {
        with.progress += 1;
        with.needs_check = true;
        without.progress += 1;
        without.needs_check = false;
        vec![with, without]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;
    use crate::scheduler::{ClockScheduler, SearchClock};
    use crate::segment::extract_segments;
    use std::time::Duration;

    fn search(html: &str, css: &str) -> (HtmlDocument, SearchOutcome) {
        let doc = HtmlDocument::parse(html);
        let target = doc.select_first(css).unwrap();
        let segments = extract_segments(&doc, target, None);
        let mut scheduler =
            ClockScheduler::new(SearchClock::with_budget(Duration::from_secs(30)));
        let outcome = SearchEngine::new(&doc, &segments).run(&mut scheduler);
        (doc, outcome)
    }

    #[test]
    fn test_class_name_cost() {
        assert_eq!(class_name_cost("btn"), 4);
        assert_eq!(class_name_cost("button"), 3);
        assert_eq!(class_name_cost("primaryaction"), 2);
        assert_eq!(class_name_cost("abcdefghij"), 3);
    }

    #[test]
    fn test_queue_order_is_cost_then_insertion() {
        let mut heap = BinaryHeap::new();
        heap.push(Queued { cost: 5, seq: 0, item: 'a' });
        heap.push(Queued { cost: 3, seq: 1, item: 'b' });
        heap.push(Queued { cost: 5, seq: 2, item: 'c' });
        heap.push(Queued { cost: 3, seq: 3, item: 'd' });
        let order: Vec<char> = std::iter::from_fn(|| heap.pop().map(|q| q.item)).collect();
        assert_eq!(order, vec!['b', 'd', 'a', 'c']);
    }

    #[test]
    fn test_unique_tag_is_found_immediately() {
        let (_, outcome) = search("<html><body><main>x</main></body></html>", "main");
        let locator = outcome.locator.unwrap();
        assert_eq!(locator.expression, "//main");
        assert_eq!(locator.cost, BARE_SEGMENT_COST);
        assert_eq!(outcome.stats.stop_reason, StopReason::Exhausted);
        assert_eq!(outcome.stats.finished, 1);
    }

    #[test]
    fn test_identifier_beats_structure() {
        let (_, outcome) = search(
            r#"<html><body><div><p>a</p><p id="note">b</p></div></body></html>"#,
            "#note",
        );
        let locator = outcome.locator.unwrap();
        assert_eq!(locator.expression, r#"id("note")"#);
        assert_eq!(locator.cost, USED_SEGMENT_COST + IDENTIFIER_COST);
    }

    #[test]
    fn test_input_name() {
        let (_, outcome) = search(
            r#"<html><body><form><input name="user"><input name="pass"></form></body></html>"#,
            "input[name=pass]",
        );
        assert_eq!(outcome.locator.unwrap().expression, r#"//input[@name="pass"]"#);
    }

    #[test]
    fn test_ancestor_is_used_when_target_has_nothing() {
        let (doc, outcome) = search(
            r#"<html><body><nav><a>x</a></nav><footer class="site"><a>y</a></footer></body></html>"#,
            "footer a",
        );
        let locator = outcome.locator.unwrap();
        assert_eq!(
            locator.expression,
            r#"//footer[contains(concat(" ",normalize-space(@class)," ")," site ")]/a"#
        );
        let footer_link = doc.select_first("footer a").unwrap();
        assert_eq!(oracle::resolve_unique(&doc, &locator.expression), Some(footer_link));
    }

    #[test]
    fn test_no_candidate() {
        let doc = HtmlDocument::parse("<html><body></body></html>");
        let engine = SearchEngine::new(&doc, &[]);
        assert_eq!(engine.pending(), 0);
        let outcome = engine.finish(StopReason::Exhausted);
        assert_eq!(outcome.locator, None);
        assert_eq!(outcome.stats.explored, 0);
    }

    #[test]
    fn test_step_reports_exhaustion() {
        let doc = HtmlDocument::parse("<html><body><p>a</p><p>b</p></body></html>");
        let target = doc.select("p").unwrap()[1];
        let segments = extract_segments(&doc, target, None);
        let mut engine = SearchEngine::new(&doc, &segments);
        assert_eq!(engine.best_cost(), None);
        while !engine.step(1) {}
        assert!(engine.best_cost().is_some());
        let outcome = engine.finish(StopReason::Exhausted);
        assert_eq!(outcome.locator.unwrap().expression, "//p[2]");
    }

    #[test]
    fn test_cancelled_before_start() {
        let doc = HtmlDocument::parse("<html><body><p>a</p></body></html>");
        let target = doc.select_first("p").unwrap();
        let segments = extract_segments(&doc, target, None);
        let clock = SearchClock::with_budget(Duration::from_secs(30));
        clock.token().cancel();
        let mut scheduler = ClockScheduler::new(clock).with_yield_every(1);
        let outcome = SearchEngine::new(&doc, &segments).run(&mut scheduler);
        // The first batch still runs; "//p" is unique on this page.
        assert_eq!(outcome.stats.stop_reason, StopReason::Exhausted);
        assert_eq!(outcome.locator.unwrap().expression, "//p");
    }

    #[test]
    fn test_loose_only_candidate_does_not_block_search() {
        let doc = HtmlDocument::parse(
            r#"<html><body><div><span class="btn-primary">a</span></div><div><span>b</span></div></body></html>"#,
        );
        let target = doc.select_first("span").unwrap();
        let mut segments = extract_segments(&doc, target, None);
        // "btn" is a substring of the class attribute but not one of its tokens.
        if let Some(last) = segments.last_mut() {
            last.class_names = Some(vec!["btn".to_string()]);
        }
        let mut scheduler =
            ClockScheduler::new(SearchClock::with_budget(Duration::from_secs(30)));
        let outcome = SearchEngine::new(&doc, &segments).run(&mut scheduler);

        let locator = outcome.locator.unwrap();
        assert!(!locator.expression.contains("btn"), "{}", locator.expression);
        assert_eq!(oracle::resolve_unique(&doc, &locator.expression), Some(target));
    }

    #[test]
    fn test_yielding_run_matches_blocking_run() {
        let doc = HtmlDocument::parse(
            "<html><body><ul><li>a</li><li>b</li><li>c</li><li>d</li></ul></body></html>",
        );
        let target = doc.select("li").unwrap()[2];
        let segments = extract_segments(&doc, target, None);
        let clock = || SearchClock::with_budget(Duration::from_secs(30));

        let mut blocking = ClockScheduler::new(clock()).with_yield_every(1);
        let expected = SearchEngine::new(&doc, &segments).run(&mut blocking);

        let yields = std::cell::Cell::new(0);
        let mut scheduler = ClockScheduler::new(clock()).with_yield_every(1);
        let outcome = tokio_test::block_on(SearchEngine::new(&doc, &segments).run_yielding(
            &mut scheduler,
            || {
                yields.set(yields.get() + 1);
                std::future::ready(())
            },
        ));

        assert_eq!(outcome.locator, expected.locator);
        assert_eq!(outcome.stats.explored, expected.stats.explored);
        assert_eq!(outcome.stats.stop_reason, StopReason::Exhausted);
        assert!(yields.get() > 0);
    }
}
