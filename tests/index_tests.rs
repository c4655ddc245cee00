use hnsw_index::hnsw::distance::euclidean_sq;
use hnsw_index::{HnswConfig, HnswError, HnswIndex, Label};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

fn random_points(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect()
}

fn build(points: &[Vec<f32>], config: HnswConfig) -> HnswIndex {
    let mut index = HnswIndex::new(points[0].len(), config).unwrap();
    for (i, p) in points.iter().enumerate() {
        index.add_point(p, i as Label).unwrap();
    }
    index
}

fn brute_force(points: &[Vec<f32>], query: &[f32], k: usize) -> Vec<(f32, Label)> {
    let mut all: Vec<(f32, Label)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (euclidean_sq(p, query), i as Label))
        .collect();
    all.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
    all.truncate(k);
    all
}

// ── Concrete scenario ──────────────────────────────────────────────

#[test]
fn test_five_point_scenario() {
    let mut index = HnswIndex::new(2, HnswConfig::new(2, 10)).unwrap();
    index.add_point(&[0.0, 0.0], 1).unwrap();
    index.add_point(&[1.0, 0.0], 2).unwrap();
    index.add_point(&[0.0, 1.0], 3).unwrap();
    index.add_point(&[10.0, 10.0], 4).unwrap();
    index.add_point(&[10.0, 11.0], 5).unwrap();

    let results = index.search_knn(&[0.1, 0.1], 2, 10).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].1, 1);
    assert!(results[1].1 == 2 || results[1].1 == 3, "got {:?}", results);
    assert!((results[0].0 - 0.02).abs() < 1e-6);

    let all = index.search_knn(&[0.1, 0.1], 5, 10).unwrap();
    let labels: Vec<Label> = all.iter().map(|&(_, l)| l).collect();
    assert_eq!(&labels[3..], &[4, 5]);
}

// ── Self retrieval ─────────────────────────────────────────────────

#[test]
fn test_exact_self_retrieval() {
    let points = random_points(200, 8, 1);
    let index = build(&points, HnswConfig::new(8, 100).with_seed(3));
    for (i, p) in points.iter().enumerate() {
        let results = index.search_knn(p, 1, 128).unwrap();
        assert_eq!(results, vec![(0.0, i as Label)], "point {i}");
    }
}

#[test]
fn test_self_retrieval_immediately_after_insert() {
    let points = random_points(100, 4, 2);
    let mut index = HnswIndex::new(4, HnswConfig::new(6, 64)).unwrap();
    for (i, p) in points.iter().enumerate() {
        index.add_point(p, 1000 + i as Label).unwrap();
        let results = index.search_knn(p, 1, 100).unwrap();
        assert_eq!(results, vec![(0.0, 1000 + i as Label)]);
    }
}

// ── Graph invariants ───────────────────────────────────────────────

#[test]
fn test_adjacency_levels_and_degree_bounds() {
    for use_heuristic in [true, false] {
        let points = random_points(500, 6, 4);
        let index = build(
            &points,
            HnswConfig::new(3, 40).with_heuristic(use_heuristic).with_seed(9),
        );
        for id in 0..index.len() as u32 {
            let level = index.level_of(id).unwrap();
            for layer in 0..=level {
                let adj = index.neighbors(id, layer).unwrap();
                let bound = if layer == 0 { index.m_max0() } else { index.m_max() };
                assert!(adj.len() <= bound, "node {id} layer {layer} degree {}", adj.len());
            }
            assert!(index.neighbors(id, level + 1).is_none());
        }
        let ep = index.entry_point().unwrap();
        assert_eq!(index.level_of(ep), Some(index.max_level()));
        let top = (0..index.len() as u32).filter_map(|id| index.level_of(id)).max().unwrap();
        assert_eq!(index.max_level(), top);
        index.validate().unwrap();
    }
}

#[test]
fn test_same_seed_builds_identical_graph() {
    let points = random_points(150, 5, 5);
    let cfg = HnswConfig::new(4, 32).with_seed(77);
    let a = build(&points, cfg.clone());
    let b = build(&points, cfg);
    assert_eq!(a.max_level(), b.max_level());
    assert_eq!(a.entry_point(), b.entry_point());
    for id in 0..a.len() as u32 {
        assert_eq!(a.level_of(id), b.level_of(id));
        for layer in 0..=a.level_of(id).unwrap() {
            assert_eq!(a.neighbors(id, layer), b.neighbors(id, layer));
        }
    }
}

// ── Result shape ───────────────────────────────────────────────────

#[test]
fn test_results_sorted_with_expected_length() {
    // m_max0 = 64 keeps layer 0 unpruned, so every point is reachable
    let points = random_points(60, 3, 6);
    let index = build(&points, HnswConfig::new(32, 32));
    let query = [0.2, -0.1, 0.5];
    for k in [1, 5, 10, 60, 100] {
        let results = index.search_knn(&query, k, 8).unwrap();
        assert_eq!(results.len(), k.min(index.len()));
        assert!(results.windows(2).all(|w| w[0].0 <= w[1].0));
    }
    assert!(index.search_knn(&query, 0, 8).unwrap().is_empty());
}

#[test]
fn test_unbounded_k_and_ef() {
    let points = random_points(40, 3, 20);
    let index = build(&points, HnswConfig::new(4, 16));
    let nearest = index.search_knn(&points[7], 1, usize::MAX).unwrap();
    assert_eq!(nearest, vec![(0.0, 7)]);

    let all = index.search_knn(&points[7], usize::MAX, 1).unwrap();
    assert_eq!(all, brute_force(&points, &points[7], 40));
}

#[test]
fn test_empty_index_query() {
    let index = HnswIndex::new(3, HnswConfig::default()).unwrap();
    assert!(index.search_knn(&[1.0, 2.0, 3.0], 5, 10).unwrap().is_empty());
    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
}

#[test]
fn test_query_dimension_mismatch() {
    let points = random_points(10, 3, 7);
    let index = build(&points, HnswConfig::default());
    assert!(matches!(
        index.search_knn(&[1.0, 2.0], 1, 10),
        Err(HnswError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

// ── Brute-force cross-check ────────────────────────────────────────

#[test]
fn test_matches_brute_force_when_exhaustive() {
    // M = 3 keeps layer 0 at 6 links per node, so pruning runs on most inserts
    for use_heuristic in [true, false] {
        let points = random_points(50, 4, 8);
        let index = build(
            &points,
            HnswConfig::new(3, 10).with_heuristic(use_heuristic).with_seed(1),
        );
        let queries = random_points(20, 4, 99);
        for q in &queries {
            for k in [1, 3, 10, 50] {
                let got = index.search_knn(q, k, index.len()).unwrap();
                assert_eq!(got, brute_force(&points, q, k));
            }
        }
    }
}

#[test]
fn test_exhaustive_search_finds_every_point_with_small_m() {
    for m in 2..=4 {
        for seed in 0..20u64 {
            let points = random_points(50, 4, 1000 + seed);
            let index = build(&points, HnswConfig::new(m, 10).with_seed(seed));
            index.validate().unwrap();
            let found = index.search_knn(&points[0], 50, 50).unwrap();
            assert_eq!(found.len(), 50, "M={m} seed={seed}");
            assert_eq!(found, brute_force(&points, &points[0], 50), "M={m} seed={seed}");
        }
    }
}

// ── Duplicate labels ───────────────────────────────────────────────

#[test]
fn test_duplicate_label_rejected_without_side_effects() {
    let points = random_points(40, 4, 10);
    let mut index = build(&points, HnswConfig::new(4, 32));
    let before_len = index.len();
    let before_level = index.max_level();
    let before_ep = index.entry_point();
    let before_adj: Vec<Vec<u32>> = (0..index.len() as u32)
        .map(|id| index.neighbors(id, 0).unwrap().to_vec())
        .collect();
    let before_bytes = hnsw_index::storage::encode_snapshot(&index).unwrap();

    let err = index.add_point(&[0.0, 0.0, 0.0, 0.0], 5).unwrap_err();
    assert!(matches!(err, HnswError::DuplicateLabel(5)));

    assert_eq!(index.len(), before_len);
    assert_eq!(index.max_level(), before_level);
    assert_eq!(index.entry_point(), before_ep);
    for (id, adj) in before_adj.iter().enumerate() {
        assert_eq!(index.neighbors(id as u32, 0).unwrap(), adj.as_slice());
    }
    // Level sampler state is untouched as well
    assert_eq!(hnsw_index::storage::encode_snapshot(&index).unwrap(), before_bytes);
}

// ── Persistence ────────────────────────────────────────────────────

#[test]
fn test_save_load_identical_results() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("index.hnsw");
    let points = random_points(300, 8, 11);
    let index = build(&points, HnswConfig::new(6, 50).with_seed(12));
    index.save_index(&path).unwrap();

    let mut loaded = HnswIndex::new(1, HnswConfig::default()).unwrap();
    loaded.load_index(&path).unwrap();
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.max_level(), index.max_level());
    assert_eq!(loaded.dimension(), 8);
    assert_eq!(loaded.config(), index.config());

    for q in random_points(50, 8, 13) {
        for (k, ef) in [(1, 1), (5, 10), (20, 40)] {
            assert_eq!(
                loaded.search_knn(&q, k, ef).unwrap(),
                index.search_knn(&q, k, ef).unwrap()
            );
        }
    }
}

#[test]
fn test_loaded_index_keeps_building_deterministically() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("index.hnsw");
    let points = random_points(120, 4, 14);
    let cfg = HnswConfig::new(4, 32).with_seed(15);

    let mut original = build(&points[..60], cfg.clone());
    original.save_index(&path).unwrap();
    let mut loaded = HnswIndex::load(&path).unwrap();

    for (i, p) in points[60..].iter().enumerate() {
        let label = 60 + i as Label;
        original.add_point(p, label).unwrap();
        loaded.add_point(p, label).unwrap();
    }
    assert_eq!(
        hnsw_index::storage::encode_snapshot(&original).unwrap(),
        hnsw_index::storage::encode_snapshot(&loaded).unwrap()
    );
}

#[test]
fn test_load_into_non_empty_index_rejected() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("index.hnsw");
    let points = random_points(10, 2, 16);
    let index = build(&points, HnswConfig::default());
    index.save_index(&path).unwrap();

    let mut other = build(&points[..3], HnswConfig::default());
    assert!(matches!(
        other.load_index(&path),
        Err(HnswError::NotEmpty { count: 3 })
    ));
    assert_eq!(other.len(), 3);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let tmp_dir = TempDir::new().unwrap();
    let result = HnswIndex::load(tmp_dir.path().join("missing.hnsw"));
    assert!(matches!(result, Err(HnswError::Io(_))));
}

#[test]
fn test_load_truncated_file_is_format_error() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("index.hnsw");
    let points = random_points(50, 4, 17);
    build(&points, HnswConfig::default()).save_index(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 20]).unwrap();
    assert!(matches!(HnswIndex::load(&path), Err(HnswError::Format(_))));
}

#[test]
fn test_failed_save_leaves_no_temp_file() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("index.hnsw");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("occupied"), b"x").unwrap();

    let points = random_points(5, 2, 19);
    let result = build(&points, HnswConfig::default()).save_index(&path);
    assert!(matches!(result, Err(HnswError::Io(_))));
    assert!(!tmp_dir.path().join("index.hnsw.tmp").exists());
}

#[test]
fn test_save_leaves_no_temp_file() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("index.hnsw");
    let points = random_points(5, 2, 18);
    build(&points, HnswConfig::default()).save_index(&path).unwrap();
    let names: Vec<String> = std::fs::read_dir(tmp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["index.hnsw".to_string()]);
}
