//! End-to-end query tests over an in-memory dataset.
//!
//! Exercises the whole load-then-query surface the explorer front-end uses:
//! open, fetch display-normalized expression, rank separating genes, read
//! annotations and marker tables, and place cells by the 3D embedding.

use cellscape::annotations::{CategoryCodes, MARKERS_PER_CATEGORY};
use cellscape::container::MemoryContainer;
use cellscape::dataset::Dataset;
use cellscape::diffexp::DeMethod;
use cellscape::error::Error;
use cellscape::expression::DISPLAY_CEILING;

// 8 cells x 4 genes, CSC:
//   gene 0 "Flat":   4.0 in every cell
//   gene 1 "Split":  high in cells 0-3, low in cells 4-7
//   gene 2 "Silent": all zero
//   gene 3 "Linear": 1..5 in cells 0-4, zero after
fn sample_container() -> MemoryContainer {
    let flat = [4.0f32; 8];
    let split = [9.0f32, 8.0, 9.5, 8.5, 1.0, 2.0, 1.5, 2.5];
    let linear = [1.0f32, 2.0, 3.0, 4.0, 5.0];

    let mut data = Vec::new();
    let mut indices = Vec::new();
    let mut indptr = vec![0i32];
    for col in [&flat[..], &split[..], &[][..], &linear[..]] {
        for (cell, &v) in col.iter().enumerate() {
            data.push(v);
            indices.push(cell as i32);
        }
        indptr.push(data.len() as i32);
    }

    let coords: Vec<f32> = (0..24).map(|i| i as f32 * 0.5).collect();

    MemoryContainer::new()
        .with_strings(
            "obs/_index",
            (0..8).map(|i| format!("cell{i}")).collect::<Vec<_>>(),
        )
        .with_f32("X/data", data)
        .with_i32("X/indices", indices)
        .with_i32("X/indptr", indptr)
        .with_strings("var/gene_ids", vec!["E0", "E1", "E2", "E3"])
        .with_strings("var/gene_names", vec!["Flat", "Split", "Silent", "Linear"])
        .with_strings("obs/cluster/categories", vec!["a", "b", "c"])
        .with_codes(
            "obs/cluster/codes",
            CategoryCodes::I8(vec![0, 0, 0, 1, 1, 1, 2, 2]),
        )
        .with_strings("obs/cell_ontology_class/categories", vec!["t", "b"])
        .with_codes(
            "obs/cell_ontology_class/codes",
            CategoryCodes::I8(vec![0, 0, 0, 0, 1, 1, 1, 1]),
        )
        .with_strings(
            "uns/markers/cluster/names",
            (0..30).map(|i| format!("m{i}")).collect::<Vec<_>>(),
        )
        .with_f32(
            "uns/markers/cluster/pvals",
            (0..30).map(|i| i as f32 * 1e-3).collect(),
        )
        .with_f32(
            "uns/markers/cluster/logfoldchanges",
            (0..30).map(|i| i as f32 * 0.1).collect(),
        )
        .with_f32("obsm/X_umap_3d", coords)
}

#[test]
fn open_reports_consistent_shape() {
    let ds = Dataset::open(sample_container()).unwrap();
    assert_eq!(ds.n_cells(), 8);
    assert_eq!(ds.n_genes(), 4);
    assert_eq!(ds.cell_ids()[0], "cell0");
    assert_eq!(ds.matrix().nnz(), 21);
    // The all-zero gene never makes the informative set.
    assert!(!ds.genes().informative_genes().contains(&2));
}

#[test]
fn fetch_normalizes_into_display_range() {
    let ds = Dataset::open(sample_container()).unwrap();
    let result = ds.fetch(&[3, 2]).unwrap();

    // Linear peaks at 5, so the scale is exactly 2.
    assert_eq!(
        result.expression[0],
        vec![2.0, 4.0, 6.0, 8.0, 10.0, 0.0, 0.0, 0.0]
    );
    assert_eq!(result.display_max[0], 5);
    assert_eq!(result.gene_names[0], "Linear");

    // A silent gene comes back untouched with the default ceiling.
    assert_eq!(result.expression[1], vec![0.0; 8]);
    assert_eq!(result.display_max[1], DISPLAY_CEILING as i32);

    for column in &result.expression {
        for &v in column {
            assert!((0.0..=DISPLAY_CEILING).contains(&v));
        }
    }
}

#[test]
fn empty_fetch_draws_configured_sample() {
    let ds = Dataset::open(sample_container()).unwrap();
    let result = ds.fetch(&[]).unwrap();
    assert_eq!(result.gene_indices.len(), 21);
    assert!(result.gene_indices.iter().all(|&g| g < 4));
}

#[test]
fn top_genes_finds_the_separator() {
    let ds = Dataset::open(sample_container()).unwrap();
    let selected = [0usize, 1, 2, 3];
    let background = [4usize, 5, 6, 7];

    for method in [DeMethod::RankSum, DeMethod::TTest] {
        let top = ds.top_genes(&selected, &background, method, 10).unwrap();
        assert_eq!(top[0], 1, "method {method:?}");
        // The silent gene is not a candidate at all.
        assert!(!top.contains(&2), "method {method:?}");
    }

    let ranked = ds
        .ranked_genes(&selected, &background, DeMethod::RankSum, 10)
        .unwrap();
    for pair in ranked.windows(2) {
        assert!(pair[0].p_value <= pair[1].p_value);
    }
}

#[test]
fn diffexp_rejects_bad_groups() {
    let ds = Dataset::open(sample_container()).unwrap();
    assert!(matches!(
        ds.top_genes(&[], &[0], DeMethod::RankSum, 5),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        ds.top_genes(&[0], &[99], DeMethod::RankSum, 5),
        Err(Error::OutOfRange { what: "cell", .. })
    ));
}

#[test]
fn annotations_expose_categories_and_membership() {
    let ds = Dataset::open(sample_container()).unwrap();
    let fields = ds.annotations().field_names();
    assert!(fields.contains(&"cluster"));
    assert!(fields.contains(&"cell_ontology_class"));

    // cell_ontology_class wins the default slot when present.
    let default = ds.default_field().unwrap();
    assert_eq!(ds.annotations().fields()[default].name, "cell_ontology_class");

    let cluster = ds
        .annotations()
        .fields()
        .iter()
        .find(|f| f.name == "cluster")
        .unwrap();
    assert_eq!(cluster.category_of(3), "b");
    assert_eq!(cluster.category_of(7), "c");
}

#[test]
fn marker_table_slices_per_category() {
    let ds = Dataset::open(sample_container()).unwrap();
    let cluster = ds
        .annotations()
        .fields()
        .iter()
        .position(|f| f.name == "cluster")
        .unwrap();

    let table = ds.marker_table(cluster, None).unwrap();
    assert_eq!(table.n_categories, 3);
    assert_eq!(table.names.len(), 3);
    assert_eq!(table.names[1][0], "m10");
    assert_eq!(table.names[1].len(), MARKERS_PER_CATEGORY);

    let one = ds.marker_table(cluster, Some(2)).unwrap();
    assert_eq!(one.names.len(), 1);
    assert_eq!(one.names[0][0], "m20");
    assert!((one.p_values[0][9] - 0.029).abs() < 1e-6);
}

#[test]
fn marker_table_absent_for_unannotated_field() {
    let ds = Dataset::open(sample_container()).unwrap();
    let coc = ds
        .annotations()
        .fields()
        .iter()
        .position(|f| f.name == "cell_ontology_class")
        .unwrap();
    let table = ds.marker_table(coc, None).unwrap();
    assert!(table.is_absent());
    assert_eq!(table.n_categories, 2);
}

#[test]
fn embedding_places_every_cell() {
    let ds = Dataset::open(sample_container()).unwrap();
    assert_eq!(ds.embedding().len(), 8);
    assert_eq!(ds.embedding().get(0), Some([0.0, 0.5, 1.0]));
    assert_eq!(ds.embedding().get(7), Some([10.5, 11.0, 11.5]));
    assert_eq!(ds.embedding().get(8), None);
}

#[test]
fn summary_serializes() {
    let ds = Dataset::open(sample_container()).unwrap();
    let summary = ds.summary();
    assert_eq!(summary.n_cells, 8);
    assert_eq!(summary.annotation_fields.len(), 2);
    assert_eq!(summary.default_field.as_deref(), Some("cell_ontology_class"));
    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"n_informative_genes\""));
}
