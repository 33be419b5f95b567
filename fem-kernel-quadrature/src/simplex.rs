//! Quadrature rules for the reference triangle and tetrahedron.
//!
//! Low degrees use the classical tabulated schemes (Zienkiewicz & Taylor, Strang & Fix, and
//! Keast, "Moderate-degree tetrahedral quadrature formulas", CMAME 55(3), 1986). All other
//! degrees fall back to collapsed Gauss rules built from the Duffy transformation.

use crate::univariate::gauss;
use crate::{QuadratureScheme, Rule};

/// A triangle rule exact for polynomials of total degree `degree`.
pub fn triangle(degree: usize, scheme: QuadratureScheme) -> Rule<2> {
    match scheme {
        QuadratureScheme::Default => tabulated_triangle(degree).unwrap_or_else(|| collapsed_triangle(degree)),
        QuadratureScheme::Canonical => collapsed_triangle(degree),
    }
}

/// A tetrahedron rule exact for polynomials of total degree `degree`.
pub fn tetrahedron(degree: usize, scheme: QuadratureScheme) -> Rule<3> {
    match scheme {
        QuadratureScheme::Default => tabulated_tetrahedron(degree).unwrap_or_else(|| collapsed_tetrahedron(degree)),
        QuadratureScheme::Canonical => collapsed_tetrahedron(degree),
    }
}

/// Collapsed Gauss rule on the triangle.
///
/// Uses $x = u$, $y = v (1 - u)$ with Jacobian $(1 - u)$, so the integrand has degree
/// `degree + 1` in $u$.
pub fn collapsed_triangle(degree: usize) -> Rule<2> {
    let (w1d, p1d) = gauss((degree + 3) / 2);
    let mut weights = Vec::with_capacity(w1d.len().pow(2));
    let mut points = Vec::with_capacity(w1d.len().pow(2));
    for (&wu, &[u]) in w1d.iter().zip(&p1d) {
        for (&wv, &[v]) in w1d.iter().zip(&p1d) {
            weights.push(wu * wv * (1.0 - u));
            points.push([u, v * (1.0 - u)]);
        }
    }
    (weights, points)
}

/// Collapsed Gauss rule on the tetrahedron.
///
/// Uses $x = u$, $y = v (1 - u)$, $z = w (1 - u)(1 - v)$ with Jacobian $(1 - u)^2 (1 - v)$.
pub fn collapsed_tetrahedron(degree: usize) -> Rule<3> {
    let (w1d, p1d) = gauss((degree + 4) / 2);
    let n = w1d.len();
    let mut weights = Vec::with_capacity(n * n * n);
    let mut points = Vec::with_capacity(n * n * n);
    for (&wu, &[u]) in w1d.iter().zip(&p1d) {
        for (&wv, &[v]) in w1d.iter().zip(&p1d) {
            for (&ww, &[w]) in w1d.iter().zip(&p1d) {
                weights.push(wu * wv * ww * (1.0 - u).powi(2) * (1.0 - v));
                points.push([u, v * (1.0 - u), w * (1.0 - u) * (1.0 - v)]);
            }
        }
    }
    (weights, points)
}

fn uniform_weights<const D: usize>(points: Vec<[f64; D]>, weight: f64) -> Rule<D> {
    (vec![weight; points.len()], points)
}

/// Expands grouped weights `(count, weight)` in point order.
fn grouped_weights<const D: usize>(points: Vec<[f64; D]>, groups: &[(usize, f64)], scale: f64) -> Rule<D> {
    let weights: Vec<f64> = groups
        .iter()
        .flat_map(|&(count, w)| std::iter::repeat(w * scale).take(count))
        .collect();
    debug_assert_eq!(weights.len(), points.len());
    (weights, points)
}

#[rustfmt::skip]
fn tabulated_triangle(degree: usize) -> Option<Rule<2>> {
    let rule = match degree {
        0 | 1 => uniform_weights(vec![[1.0 / 3.0, 1.0 / 3.0]], 0.5),
        2 => uniform_weights(vec![
            [1.0 / 6.0, 1.0 / 6.0],
            [1.0 / 6.0, 2.0 / 3.0],
            [2.0 / 3.0, 1.0 / 6.0],
        ], 1.0 / 6.0),
        3 => uniform_weights(vec![
            [0.659027622374092, 0.231933368553031],
            [0.659027622374092, 0.109039009072877],
            [0.231933368553031, 0.659027622374092],
            [0.231933368553031, 0.109039009072877],
            [0.109039009072877, 0.659027622374092],
            [0.109039009072877, 0.231933368553031],
        ], 1.0 / 12.0),
        4 => grouped_weights(vec![
            [0.816847572980459, 0.091576213509771],
            [0.091576213509771, 0.816847572980459],
            [0.091576213509771, 0.091576213509771],
            [0.108103018168070, 0.445948490915965],
            [0.445948490915965, 0.108103018168070],
            [0.445948490915965, 0.445948490915965],
        ], &[(3, 0.109951743655322), (3, 0.223381589678011)], 0.5),
        5 => grouped_weights(vec![
            [0.33333333333333333, 0.33333333333333333],
            [0.79742698535308720, 0.10128650732345633],
            [0.10128650732345633, 0.79742698535308720],
            [0.10128650732345633, 0.10128650732345633],
            [0.05971587178976981, 0.47014206410511505],
            [0.47014206410511505, 0.05971587178976981],
            [0.47014206410511505, 0.47014206410511505],
        ], &[(1, 0.22500000000000000), (3, 0.12593918054482717), (3, 0.13239415278850616)], 0.5),
        6 => grouped_weights(vec![
            [0.873821971016996, 0.063089014491502],
            [0.063089014491502, 0.873821971016996],
            [0.063089014491502, 0.063089014491502],
            [0.501426509658179, 0.249286745170910],
            [0.249286745170910, 0.501426509658179],
            [0.249286745170910, 0.249286745170910],
            [0.636502499121399, 0.310352451033785],
            [0.636502499121399, 0.053145049844816],
            [0.310352451033785, 0.636502499121399],
            [0.310352451033785, 0.053145049844816],
            [0.053145049844816, 0.636502499121399],
            [0.053145049844816, 0.310352451033785],
        ], &[(3, 0.050844906370207), (3, 0.116786275726379), (6, 0.082851075618374)], 0.5),
        _ => return None,
    };
    Some(rule)
}

#[rustfmt::skip]
fn tabulated_tetrahedron(degree: usize) -> Option<Rule<3>> {
    let rule = match degree {
        0 | 1 => uniform_weights(vec![[0.25, 0.25, 0.25]], 1.0 / 6.0),
        2 => {
            let (a, b) = (0.585410196624969, 0.138196601125011);
            uniform_weights(vec![[a, b, b], [b, a, b], [b, b, a], [b, b, b]], 1.0 / 24.0)
        }
        // Note the negative weight
        3 => grouped_weights(vec![
            [0.2500000000000000, 0.2500000000000000, 0.2500000000000000],
            [0.5000000000000000, 0.1666666666666666, 0.1666666666666666],
            [0.1666666666666666, 0.5000000000000000, 0.1666666666666666],
            [0.1666666666666666, 0.1666666666666666, 0.5000000000000000],
            [0.1666666666666666, 0.1666666666666666, 0.1666666666666666],
        ], &[(1, -0.8), (4, 0.45)], 1.0 / 6.0),
        4 => grouped_weights(vec![
            [0.0000000000000000, 0.5000000000000000, 0.5000000000000000],
            [0.5000000000000000, 0.0000000000000000, 0.5000000000000000],
            [0.5000000000000000, 0.5000000000000000, 0.0000000000000000],
            [0.5000000000000000, 0.0000000000000000, 0.0000000000000000],
            [0.0000000000000000, 0.5000000000000000, 0.0000000000000000],
            [0.0000000000000000, 0.0000000000000000, 0.5000000000000000],
            [0.6984197043243866, 0.1005267652252045, 0.1005267652252045],
            [0.1005267652252045, 0.1005267652252045, 0.1005267652252045],
            [0.1005267652252045, 0.1005267652252045, 0.6984197043243866],
            [0.1005267652252045, 0.6984197043243866, 0.1005267652252045],
            [0.0568813795204234, 0.3143728734931922, 0.3143728734931922],
            [0.3143728734931922, 0.3143728734931922, 0.3143728734931922],
            [0.3143728734931922, 0.3143728734931922, 0.0568813795204234],
            [0.3143728734931922, 0.0568813795204234, 0.3143728734931922],
        ], &[(6, 0.0190476190476190), (4, 0.0885898247429807), (4, 0.1328387466855907)], 1.0 / 6.0),
        5 => grouped_weights(vec![
            [0.2500000000000000, 0.2500000000000000, 0.2500000000000000],
            [0.0000000000000000, 0.3333333333333333, 0.3333333333333333],
            [0.3333333333333333, 0.3333333333333333, 0.3333333333333333],
            [0.3333333333333333, 0.3333333333333333, 0.0000000000000000],
            [0.3333333333333333, 0.0000000000000000, 0.3333333333333333],
            [0.7272727272727273, 0.0909090909090909, 0.0909090909090909],
            [0.0909090909090909, 0.0909090909090909, 0.0909090909090909],
            [0.0909090909090909, 0.0909090909090909, 0.7272727272727273],
            [0.0909090909090909, 0.7272727272727273, 0.0909090909090909],
            [0.4334498464263357, 0.0665501535736643, 0.0665501535736643],
            [0.0665501535736643, 0.4334498464263357, 0.0665501535736643],
            [0.0665501535736643, 0.0665501535736643, 0.4334498464263357],
            [0.0665501535736643, 0.4334498464263357, 0.4334498464263357],
            [0.4334498464263357, 0.0665501535736643, 0.4334498464263357],
            [0.4334498464263357, 0.4334498464263357, 0.0665501535736643],
        ], &[(1, 0.1817020685825351), (4, 0.0361607142857143), (4, 0.0698714945161738), (6, 0.0656948493683187)],
        1.0 / 6.0),
        6 => grouped_weights(vec![
            [0.3561913862225449, 0.2146028712591517, 0.2146028712591517],
            [0.2146028712591517, 0.2146028712591517, 0.2146028712591517],
            [0.2146028712591517, 0.2146028712591517, 0.3561913862225449],
            [0.2146028712591517, 0.3561913862225449, 0.2146028712591517],
            [0.8779781243961660, 0.0406739585346113, 0.0406739585346113],
            [0.0406739585346113, 0.0406739585346113, 0.0406739585346113],
            [0.0406739585346113, 0.0406739585346113, 0.8779781243961660],
            [0.0406739585346113, 0.8779781243961660, 0.0406739585346113],
            [0.0329863295731731, 0.3223378901422757, 0.3223378901422757],
            [0.3223378901422757, 0.3223378901422757, 0.3223378901422757],
            [0.3223378901422757, 0.3223378901422757, 0.0329863295731731],
            [0.3223378901422757, 0.0329863295731731, 0.3223378901422757],
            [0.2696723314583159, 0.0636610018750175, 0.0636610018750175],
            [0.0636610018750175, 0.2696723314583159, 0.0636610018750175],
            [0.0636610018750175, 0.0636610018750175, 0.2696723314583159],
            [0.6030056647916491, 0.0636610018750175, 0.0636610018750175],
            [0.0636610018750175, 0.6030056647916491, 0.0636610018750175],
            [0.0636610018750175, 0.0636610018750175, 0.6030056647916491],
            [0.0636610018750175, 0.2696723314583159, 0.6030056647916491],
            [0.2696723314583159, 0.6030056647916491, 0.0636610018750175],
            [0.6030056647916491, 0.0636610018750175, 0.2696723314583159],
            [0.0636610018750175, 0.6030056647916491, 0.2696723314583159],
            [0.2696723314583159, 0.0636610018750175, 0.6030056647916491],
            [0.6030056647916491, 0.2696723314583159, 0.0636610018750175],
        ], &[(4, 0.0399227502581679), (4, 0.0100772110553207), (4, 0.0553571815436544), (12, 0.0482142857142857)],
        1.0 / 6.0),
        _ => return None,
    };
    Some(rule)
}
