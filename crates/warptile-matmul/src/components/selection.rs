use crate::components::{
    GemmSpecialization, TilingScheme,
    batch::HypercubeSelection,
    global::write::WritePath,
    tile::register::ProductType,
};

/// Host-side choice of one kernel variant: the tiling hierarchy plus every
/// knob that is fixed before a problem is bound to it.
#[derive(Debug, Clone)]
pub struct MatmulSelection {
    pub tiling_scheme: TilingScheme,
    pub hypercube_selection: HypercubeSelection,
    pub product_type: ProductType,
    pub write_path: WritePath,
    pub specialization: GemmSpecialization,
}

impl MatmulSelection {
    pub fn builder(tiling_scheme: TilingScheme) -> MatmulSelectionBuilder {
        let hypercube_selection = HypercubeSelection::builder(&tiling_scheme).build();
        MatmulSelectionBuilder::new()
            .tiling_scheme(tiling_scheme)
            .hypercube_selection(hypercube_selection)
    }
}

pub struct MatmulSelectionBuilder {
    tiling_scheme: Option<TilingScheme>,
    hypercube_selection: Option<HypercubeSelection>,
    product_type: ProductType,
    write_path: WritePath,
    specialization: GemmSpecialization,
}

impl MatmulSelectionBuilder {
    fn new() -> Self {
        Self {
            tiling_scheme: None,
            hypercube_selection: None,
            product_type: ProductType::default(),
            write_path: WritePath::ShuffleStage,
            specialization: GemmSpecialization::default(),
        }
    }

    pub fn tiling_scheme(mut self, tiling_scheme: TilingScheme) -> Self {
        self.tiling_scheme = Some(tiling_scheme);
        self
    }

    pub fn hypercube_selection(mut self, hypercube_selection: HypercubeSelection) -> Self {
        self.hypercube_selection = Some(hypercube_selection);
        self
    }

    pub fn product_type(mut self, product_type: ProductType) -> Self {
        self.product_type = product_type;
        self
    }

    pub fn write_path(mut self, write_path: WritePath) -> Self {
        self.write_path = write_path;
        self
    }

    pub fn specialization(mut self, specialization: GemmSpecialization) -> Self {
        self.specialization = specialization;
        self
    }

    pub fn build(self) -> MatmulSelection {
        MatmulSelection {
            tiling_scheme: self.tiling_scheme.unwrap(),
            hypercube_selection: self.hypercube_selection.unwrap(),
            product_type: self.product_type,
            write_path: self.write_path,
            specialization: self.specialization,
        }
    }
}
