//! Graph coloring for the parallel Gauss–Seidel partition.
//!
//! Triangles sharing a vertex are strongly coupled through their
//! near-field influence; the parallel Seidel sweep updates only
//! mutually non-adjacent triangles concurrently. A greedy coloring of
//! the vertex-sharing conflict graph yields the batches: within a
//! color, block solves read a consistent snapshot and write disjoint
//! entries, so the result is deterministic for any thread count.

use crate::model::Model;

/// Partition the model's triangles into conflict-free batches.
///
/// Returns batches of global triangle indices; the concatenation of all
/// batches is a permutation of `0..n_triangles`. Batches are ordered by
/// color, triangles within a batch keep canonical order.
pub(crate) fn color_triangles(model: &Model) -> Vec<Vec<usize>> {
    let refs = model.triangle_refs();
    let n = refs.len();
    if n == 0 {
        return Vec::new();
    }

    // Conflict graph: edge between triangles of one surface that share
    // a mesh vertex.
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut offset = 0;
    for surface in model.surfaces() {
        let mut vertex_to_tris: Vec<Vec<usize>> = vec![Vec::new(); surface.n_vertices()];
        for (local, idx) in surface.indices().iter().enumerate() {
            for &v in idx {
                vertex_to_tris[v].push(offset + local);
            }
        }
        for tris in &vertex_to_tris {
            for (a, &ta) in tris.iter().enumerate() {
                for &tb in &tris[a + 1..] {
                    adjacency[ta].push(tb);
                    adjacency[tb].push(ta);
                }
            }
        }
        offset += surface.n_triangles();
    }

    // Greedy coloring with a u64 bitmask fast path.
    let mut colors = vec![usize::MAX; n];
    let mut n_colors = 0;
    for t in 0..n {
        let mut used: u64 = 0;
        let mut high = Vec::new();
        for &nb in &adjacency[t] {
            let c = colors[nb];
            if c == usize::MAX {
                continue;
            }
            if c < 64 {
                used |= 1 << c;
            } else {
                high.push(c);
            }
        }
        let mut color = (!used).trailing_zeros() as usize;
        if color >= 64 {
            while high.contains(&color) {
                color += 1;
            }
        }
        colors[t] = color;
        n_colors = n_colors.max(color + 1);
    }

    let mut batches = vec![Vec::new(); n_colors];
    for (t, &c) in colors.iter().enumerate() {
        batches[c].push(t);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::surface::Surface;

    fn strip_model(n_quads: usize) -> Model {
        // A strip of quads split into triangles, all sharing chains of
        // vertices.
        let mut vertices = Vec::new();
        for i in 0..=n_quads {
            let x = i as f64;
            vertices.extend_from_slice(&[x, 0.0, 0.0, x, 1.0, 0.0]);
        }
        let mut indices = Vec::new();
        for i in 0..n_quads {
            let a = 2 * i;
            indices.extend_from_slice(&[a, a + 2, a + 3, a, a + 3, a + 1]);
        }
        let mut model = Model::new(Material::granite(), false);
        model.add_surface(Surface::from_flat(&vertices, &indices).unwrap());
        model
    }

    #[test]
    fn test_batches_cover_all_triangles() {
        let model = strip_model(8);
        let batches = color_triangles(&model);
        let mut seen: Vec<usize> = batches.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_no_conflicts_within_batch() {
        let model = strip_model(6);
        let refs = model.triangle_refs();
        let batches = color_triangles(&model);
        assert!(batches.len() >= 2);
        for batch in &batches {
            for (i, &a) in batch.iter().enumerate() {
                for &b in &batch[i + 1..] {
                    assert!(
                        !refs[a].triangle.shares_edge(refs[b].triangle),
                        "triangles {a} and {b} share an edge within one color"
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_model() {
        let model = Model::new(Material::granite(), false);
        assert!(color_triangles(&model).is_empty());
    }
}
