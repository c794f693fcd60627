//! Static catalog of dashboard modules: which sheet ranges they read, how long
//! reads stay cached, and which cells clients may edit.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use ts_rs::TS;

use crate::sheets::{FieldColumnMap, FieldSpec, SheetRange};

/// A dashboard module. Its slug is both the URL segment and the cache-key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Module {
    Pex,
    Vendas,
    Okrs,
    Kpis,
    GestaoRede,
    Carteira,
    Branches,
    Mercado,
}

impl Module {
    pub const ALL: [Module; 8] = [
        Module::Pex,
        Module::Vendas,
        Module::Okrs,
        Module::Kpis,
        Module::GestaoRede,
        Module::Carteira,
        Module::Branches,
        Module::Mercado,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Module::Pex => "pex",
            Module::Vendas => "vendas",
            Module::Okrs => "okrs",
            Module::Kpis => "kpis",
            Module::GestaoRede => "gestao-rede",
            Module::Carteira => "carteira",
            Module::Branches => "branches",
            Module::Mercado => "mercado",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|module| module.as_str() == slug)
    }

    /// Environment variable holding this module's spreadsheet id.
    pub fn spreadsheet_env(self) -> &'static str {
        match self {
            Module::Pex => "PEX_SPREADSHEET_ID",
            Module::Vendas => "VENDAS_SPREADSHEET_ID",
            Module::Okrs => "OKRS_SPREADSHEET_ID",
            Module::Kpis => "KPIS_SPREADSHEET_ID",
            Module::GestaoRede => "GESTAO_REDE_SPREADSHEET_ID",
            Module::Carteira => "CARTEIRA_SPREADSHEET_ID",
            Module::Branches => "BRANCHES_SPREADSHEET_ID",
            Module::Mercado => "MERCADO_SPREADSHEET_ID",
        }
    }

    /// `<module>:`, the prefix shared by every cache key of this module.
    pub fn cache_prefix(self) -> String {
        format!("{}:", self.as_str())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A readable sheet range exposed at `GET /api/{module}/{resource}`.
#[derive(Debug)]
pub struct Dataset {
    pub module: Module,
    pub resource: &'static str,
    pub range: SheetRange,
    pub ttl: Duration,
    /// Edge caching hints sent with successful reads.
    pub cache_control: &'static str,
}

impl Dataset {
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.module.as_str(), self.resource)
    }
}

/// How a requested key value is prepared before the exact comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyNormalization {
    Exact,
    /// Upper-case, `-` → `_` (cluster names are stored as `CLUSTER_NORTE`).
    ClusterName,
}

/// A request body field identifying the target row, and the column it matches.
#[derive(Debug, Clone, Copy)]
pub struct KeyField {
    pub name: &'static str,
    pub column: usize,
    pub normalization: KeyNormalization,
}

impl KeyField {
    const fn exact(name: &'static str, column: usize) -> Self {
        Self {
            name,
            column,
            normalization: KeyNormalization::Exact,
        }
    }

    const fn cluster(name: &'static str, column: usize) -> Self {
        Self {
            name,
            column,
            normalization: KeyNormalization::ClusterName,
        }
    }

    pub fn normalize(&self, value: &str) -> String {
        match self.normalization {
            KeyNormalization::Exact => value.to_string(),
            KeyNormalization::ClusterName => value.to_uppercase().replace('-', "_"),
        }
    }
}

/// A dataset whose rows accept single-cell edits.
#[derive(Debug)]
pub struct EditableSheet {
    pub dataset: &'static Dataset,
    pub keys: &'static [KeyField],
    pub fields: FieldColumnMap,
}

impl EditableSheet {
    pub fn key_columns(&self) -> Vec<usize> {
        self.keys.iter().map(|key| key.column).collect()
    }
}

const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

pub static PEX_RESULTADOS: Dataset = Dataset {
    module: Module::Pex,
    resource: "resultados",
    range: SheetRange::new("RESULTADOS", "A:Z"),
    ttl: minutes(5),
    cache_control: "public, s-maxage=60, stale-while-revalidate=300",
};

pub static PEX_BONUS: Dataset = Dataset {
    module: Module::Pex,
    resource: "bonus",
    range: SheetRange::new("BONUS", "A:F"),
    ttl: minutes(10),
    cache_control: "public, s-maxage=300, stale-while-revalidate=600",
};

pub static PEX_PARAMETROS: Dataset = Dataset {
    module: Module::Pex,
    resource: "parametros",
    range: SheetRange::new("PARAMETROS", "A:H"),
    ttl: minutes(10),
    cache_control: "public, s-maxage=300, stale-while-revalidate=600",
};

pub static PEX_CLUSTERS: Dataset = Dataset {
    module: Module::Pex,
    resource: "clusters",
    range: SheetRange::new("CLUSTERS", "A:D"),
    ttl: minutes(30),
    cache_control: "public, s-maxage=600, stale-while-revalidate=1800",
};

pub static VENDAS_FUNIL: Dataset = Dataset {
    module: Module::Vendas,
    resource: "funil",
    range: SheetRange::new("FUNIL", "A:P"),
    ttl: minutes(5),
    cache_control: "public, s-maxage=60, stale-while-revalidate=300",
};

pub static VENDAS_METAS: Dataset = Dataset {
    module: Module::Vendas,
    resource: "metas",
    range: SheetRange::new("METAS", "A:G"),
    ttl: minutes(10),
    cache_control: "public, s-maxage=300, stale-while-revalidate=600",
};

pub static VENDAS_DADOS: Dataset = Dataset {
    module: Module::Vendas,
    resource: "dados",
    range: SheetRange::new("VENDAS", "A:T"),
    ttl: minutes(5),
    cache_control: "public, s-maxage=60, stale-while-revalidate=300",
};

pub static OKRS_OBJETIVOS: Dataset = Dataset {
    module: Module::Okrs,
    resource: "objetivos",
    range: SheetRange::new("OBJETIVOS", "A:F"),
    ttl: minutes(5),
    cache_control: "public, s-maxage=60, stale-while-revalidate=300",
};

pub static OKRS_INDICADORES: Dataset = Dataset {
    module: Module::Okrs,
    resource: "indicadores",
    range: SheetRange::new("INDICADORES", "A:L"),
    ttl: minutes(5),
    cache_control: "public, s-maxage=60, stale-while-revalidate=300",
};

pub static KPIS_DADOS: Dataset = Dataset {
    module: Module::Kpis,
    resource: "dados",
    range: SheetRange::new("KPIS", "A:N"),
    ttl: minutes(5),
    cache_control: "public, s-maxage=60, stale-while-revalidate=300",
};

pub static GESTAO_REDE_UNIDADES: Dataset = Dataset {
    module: Module::GestaoRede,
    resource: "unidades",
    range: SheetRange::new("UNIDADES", "A:R"),
    ttl: minutes(10),
    cache_control: "public, s-maxage=300, stale-while-revalidate=600",
};

pub static CARTEIRA_DADOS: Dataset = Dataset {
    module: Module::Carteira,
    resource: "dados",
    range: SheetRange::new("CARTEIRA", "A:Q"),
    ttl: minutes(10),
    cache_control: "public, s-maxage=300, stale-while-revalidate=600",
};

pub static BRANCHES_DATA: Dataset = Dataset {
    module: Module::Branches,
    resource: "data",
    range: SheetRange::new("Branches", "A:J"),
    ttl: minutes(2),
    cache_control: "public, s-maxage=30, stale-while-revalidate=120",
};

pub static MERCADO_DADOS: Dataset = Dataset {
    module: Module::Mercado,
    resource: "dados",
    range: SheetRange::new("ANALISE MERCADO", "A3:M"),
    ttl: minutes(60),
    cache_control: "public, s-maxage=1800, stale-while-revalidate=3600",
};

pub static DATASETS: &[&Dataset] = &[
    &PEX_RESULTADOS,
    &PEX_BONUS,
    &PEX_PARAMETROS,
    &PEX_CLUSTERS,
    &VENDAS_FUNIL,
    &VENDAS_METAS,
    &VENDAS_DADOS,
    &OKRS_OBJETIVOS,
    &OKRS_INDICADORES,
    &KPIS_DADOS,
    &GESTAO_REDE_UNIDADES,
    &CARTEIRA_DADOS,
    &BRANCHES_DATA,
    &MERCADO_DADOS,
];

pub static EDITABLE_SHEETS: &[EditableSheet] = &[
    EditableSheet {
        dataset: &PEX_RESULTADOS,
        keys: &[KeyField::exact("unidade", 0), KeyField::exact("quarter", 23)],
        fields: FieldColumnMap::new(&[
            FieldSpec::decimal("vvr", 2),
            FieldSpec::decimal("mac", 3),
            FieldSpec::decimal("endividamento", 4),
            FieldSpec::decimal("nps", 5),
            FieldSpec::decimal("satisfacao", 6),
            FieldSpec::decimal("conformidade", 7),
            FieldSpec::decimal("bonus", 8),
        ]),
    },
    EditableSheet {
        dataset: &PEX_PARAMETROS,
        keys: &[KeyField::exact("indicador", 0)],
        fields: FieldColumnMap::new(&[
            FieldSpec::decimal("peso_q1", 1),
            FieldSpec::decimal("peso_q2", 2),
            FieldSpec::decimal("peso_q3", 3),
            FieldSpec::decimal("peso_q4", 4),
            FieldSpec::decimal("meta", 5),
            FieldSpec::text("ativo", 6),
        ]),
    },
    EditableSheet {
        dataset: &VENDAS_METAS,
        keys: &[KeyField::exact("unidade", 0), KeyField::exact("mes", 1)],
        fields: FieldColumnMap::new(&[
            FieldSpec::currency("meta_vendas", 2),
            FieldSpec::currency("meta_ticket", 3),
            FieldSpec::decimal("meta_leads", 4),
        ]),
    },
    EditableSheet {
        dataset: &OKRS_INDICADORES,
        keys: &[KeyField::exact("id", 0)],
        fields: FieldColumnMap::new(&[
            FieldSpec::text("status", 6),
            FieldSpec::decimal("resultado", 7),
            FieldSpec::decimal("meta", 8),
            FieldSpec::text("link", 9),
            FieldSpec::text("responsavel", 10),
        ]),
    },
    EditableSheet {
        dataset: &GESTAO_REDE_UNIDADES,
        keys: &[KeyField::cluster("cluster", 2), KeyField::exact("unidade", 0)],
        fields: FieldColumnMap::new(&[
            FieldSpec::text("fase", 4),
            FieldSpec::text("status", 5),
            FieldSpec::text("consultor", 6),
        ]),
    },
    EditableSheet {
        dataset: &BRANCHES_DATA,
        keys: &[KeyField::exact("id", 0)],
        fields: FieldColumnMap::new(&[
            FieldSpec::text("status", 4),
            FieldSpec::text("link", 5),
            FieldSpec::text("responsavel", 6),
            FieldSpec::text("observacoes", 7),
        ]),
    },
];

pub fn dataset(module: Module, resource: &str) -> Option<&'static Dataset> {
    DATASETS
        .iter()
        .copied()
        .find(|d| d.module == module && d.resource == resource)
}

pub fn editable_sheet(module: Module, resource: &str) -> Option<&'static EditableSheet> {
    EDITABLE_SHEETS
        .iter()
        .find(|s| s.dataset.module == module && s.dataset.resource == resource)
}
