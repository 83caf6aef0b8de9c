mod common;

use common::*;
use hierodec::{DecoderConfig, RecombinationIndex, Sentence, Span};

fn n_best(n: usize, distinct: bool) -> DecoderConfig {
    DecoderConfig {
        n_best_size: n,
        distinct_n_best: distinct,
        ..config()
    }
}

#[test]
fn derivations_in_descending_order() {
    let decoder = stateless_decoder(n_best(10, false));
    let input = Sentence::from("s t");
    let mut worker = decoder.new_worker(0);
    let mut search = decoder.search(&mut worker, &input);

    let mut left = RecombinationIndex::new();
    for &(text, score) in &[("b", -2.0), ("a", -1.0), ("c", -4.0)] {
        let h = leaf(&mut search, &decoder, text, score, Span::new(0, 1));
        search.recombine(&mut left, h);
    }
    let mut right = RecombinationIndex::new();
    for &(text, score) in &[("x", -0.5), ("y", -3.0)] {
        let h = leaf(&mut search, &decoder, text, score, Span::new(1, 2));
        search.recombine(&mut right, h);
    }
    assert_eq!(left.len(), 1);
    search.finish_cell(&left);
    search.finish_cell(&right);

    let a = left.representatives()[0];
    let x = right.representatives()[0];
    assert_eq!(output(&search, a), "a");
    assert_eq!(search.hypothesis(a).arcs().len(), 2);

    let mut top = RecombinationIndex::new();
    let spans = vec![Span::new(0, 1), Span::new(1, 2)];
    let straight = rule(&search, &decoder, "[X,0] [X,1]", 0.0, Span::new(0, 2), spans.clone());
    let inverted = rule(&search, &decoder, "[X,1] [X,0]", -0.1, Span::new(0, 2), spans);
    let h = search.create_hypothesis(straight, &[a, x]);
    search.recombine(&mut top, h);
    let h = search.create_hypothesis(inverted, &[a, x]);
    search.recombine(&mut top, h);
    search.finish_cell(&top);

    let best = top.best(search.arena()).unwrap();
    assert_eq!(output(&search, best), "a x");
    assert_eq!(search.best_path(best), vec![best, a, x]);

    let list = search.k_best(top.representatives(), 20);
    assert_eq!(list.len(), 12);
    let outputs: Vec<String> = list
        .iter()
        .take(5)
        .map(|e| e.output.iter().map(|w| w.to_string()).collect::<Vec<_>>().join(" "))
        .collect();
    assert_eq!(outputs, vec!["a x", "x a", "b x", "x b", "a y"]);
    let expected = [-1.5, -1.6, -2.5, -2.6, -4.0];
    for (entry, &score) in list.iter().zip(&expected) {
        assert!(close(entry.score.value(), score), "{} != {}", entry.score, score);
    }
    assert!(list.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(list[0].edges, vec![best, a, x]);
    assert!(close(list[11].score.value(), -7.1));
}

#[test]
fn distinct_outputs() {
    for (distinct, expected) in vec![(false, vec!["a", "a", "b"]), (true, vec!["a", "b"])] {
        let decoder = stateless_decoder(n_best(10, distinct));
        let input = Sentence::from("s");
        let mut worker = decoder.new_worker(0);
        let mut search = decoder.search(&mut worker, &input);
        let mut cell = RecombinationIndex::new();
        for &(text, score) in &[("a", -1.0), ("a", -2.0), ("b", -3.0)] {
            let h = leaf(&mut search, &decoder, text, score, Span::new(0, 1));
            search.recombine(&mut cell, h);
        }
        search.finish_cell(&cell);
        let outputs: Vec<String> = search
            .k_best(cell.representatives(), 10)
            .into_iter()
            .map(|e| e.output[0].to_string())
            .collect();
        assert_eq!(outputs, expected);
    }
}

#[test]
fn trimmed_arc_lists_bound_the_list() {
    let decoder = stateless_decoder(n_best(1, false));
    let input = Sentence::from("s");
    let mut worker = decoder.new_worker(0);
    let mut search = decoder.search(&mut worker, &input);
    let mut cell = RecombinationIndex::new();
    for &(text, score) in &[("a", -1.0), ("b", -2.0), ("c", -3.0)] {
        let h = leaf(&mut search, &decoder, text, score, Span::new(0, 1));
        search.recombine(&mut cell, h);
    }
    search.finish_cell(&cell);
    assert_eq!(search.arena().len(), 2);
    let list = search.k_best(cell.representatives(), 10);
    assert_eq!(list.len(), 2);
    assert_eq!(list[1].output[0].to_string(), "b");
}
