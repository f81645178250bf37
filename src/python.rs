use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::core::Simulation;

const DIM: usize = 3;

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn to_array(rows: &[[f64; DIM]]) -> Array2<f64> {
    let mut arr = Array2::<f64>::zeros((rows.len(), DIM));
    for (i, row) in rows.iter().enumerate() {
        for k in 0..DIM {
            arr[[i, k]] = row[k];
        }
    }
    arr
}

/// Python-facing wrapper around the 3D packing engine.
///
/// - __new__(num_spheres, initial_packing_fraction, growth_rate, max_packing_fraction,
///   temperature=1.0, seed=None)
/// - process(events) -> packing fraction after the batch
/// - synchronize(rescale=True)
/// - get_positions() / get_velocities() -> np.ndarray, shape (N, 3)
/// - set_positions(array)
#[pyclass]
pub struct PackingSim {
    sim: Simulation<DIM>,
}

#[pymethods]
impl PackingSim {
    /// Place `num_spheres` spheres at random and seed their events.
    ///
    /// Errors: raises ValueError on invalid parameters or when placement fails.
    #[new]
    #[pyo3(signature = (
        num_spheres,
        initial_packing_fraction,
        growth_rate,
        max_packing_fraction,
        temperature=1.0,
        seed=None
    ))]
    fn new(
        num_spheres: usize,
        initial_packing_fraction: f64,
        growth_rate: f64,
        max_packing_fraction: f64,
        temperature: f64,
        seed: Option<u64>,
    ) -> PyResult<Self> {
        let mut sim = Simulation::with_packing_fraction(
            num_spheres,
            initial_packing_fraction,
            growth_rate,
            max_packing_fraction,
            seed,
        )
        .map_err(py_err)?;
        sim.create_spheres(temperature).map_err(py_err)?;
        Ok(Self { sim })
    }

    /// Process `events` events (releases the GIL) and return the packing fraction.
    fn process(&mut self, py: Python<'_>, events: usize) -> PyResult<f64> {
        py.detach(|| self.sim.process(events))
            .map(|stats| stats.packing_fraction)
            .map_err(py_err)
    }

    #[pyo3(signature = (rescale=true))]
    fn synchronize(&mut self, rescale: bool) -> PyResult<()> {
        self.sim.synchronize(rescale).map_err(py_err)
    }

    fn get_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        Ok(to_array(&self.sim.positions()).into_pyarray(py).to_owned().into())
    }

    fn get_velocities<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        Ok(to_array(&self.sim.velocities()).into_pyarray(py).to_owned().into())
    }

    /// Replace all positions from an array of shape (N, 3). Velocities are kept;
    /// positions are wrapped into the unit box and must not overlap.
    fn set_positions<'py>(&mut self, positions: PyReadonlyArray2<'py, f64>) -> PyResult<()> {
        let arr = positions.as_array();
        let n = self.sim.num_spheres();
        if arr.shape() != [n, DIM] {
            return Err(py_err(format!(
                "positions must have shape ({n}, {DIM}), got {:?}",
                arr.shape()
            )));
        }
        let rows: Vec<[f64; DIM]> = arr
            .outer_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect();
        let velocities = self.sim.velocities();
        self.sim.load_configuration(&rows, &velocities).map_err(py_err)
    }

    fn packing_fraction(&self) -> f64 {
        self.sim.packing_fraction()
    }

    fn pressure(&self) -> f64 {
        self.sim.pressure()
    }

    fn radius(&self) -> f64 {
        self.sim.radius()
    }

    fn write_configuration(&self, path: &str) -> PyResult<()> {
        self.sim.write_configuration(path).map_err(py_err)
    }
}

/// The spherepack Python module entry point.
#[pymodule]
fn spherepack(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PackingSim>()?;
    Ok(())
}
