//! Fixed tables of the carbon sources and gases used by the ATP yield check
//!
//! Theoretical yields are mol ATP per mol substrate. An even chain fatty acid with
//! `2n` carbons yields `14n - 6` under aerobic conditions and nothing without oxygen.
use crate::checks::atp_yield::AtpYieldError;

/// A carbon source of the experiment panel
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Substrate {
    pub exchange_id: &'static str,
    /// Name given to the exchange reaction when the model lacks it
    pub exchange_name: &'static str,
    pub aerobic_yield: f64,
    pub anaerobic_yield: f64,
}

impl Substrate {
    /// Extracellular metabolite taken up through the exchange
    pub fn metabolite_id(&self) -> &'static str {
        metabolite_id(self.exchange_id)
    }

    pub fn theoretical_yield(&self, allow_oxygen: bool) -> f64 {
        if allow_oxygen {
            self.aerobic_yield
        } else {
            self.anaerobic_yield
        }
    }
}

/// A gas (or water) whose exchange is opened or blocked for every experiment
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Gas {
    pub exchange_id: &'static str,
    pub exchange_name: &'static str,
    /// Name given to the extracellular metabolite when the model lacks it
    pub metabolite_name: &'static str,
}

impl Gas {
    pub fn metabolite_id(&self) -> &'static str {
        metabolite_id(self.exchange_id)
    }
}

pub static OXYGEN: Gas = Gas {
    exchange_id: "EX_o2[e]",
    exchange_name: "Extracellular oxygen exchange",
    metabolite_name: "Extracellular oxygen",
};

pub static WATER: Gas = Gas {
    exchange_id: "EX_h2o[e]",
    exchange_name: "Extracellular water exchange",
    metabolite_name: "Extracellular water",
};

pub static CARBON_DIOXIDE: Gas = Gas {
    exchange_id: "EX_co2[e]",
    exchange_name: "Extracellular carbon dioxide exchange",
    metabolite_name: "Extracellular carbon dioxide",
};

pub static GASES: [&Gas; 3] = [&OXYGEN, &WATER, &CARBON_DIOXIDE];

/// The carbon sources tested, in panel order
pub static SUBSTRATES: [Substrate; 15] = [
    Substrate {
        exchange_id: "EX_glc_D[e]",
        exchange_name: "Extracellular glucose exchange",
        aerobic_yield: 31.,
        anaerobic_yield: 2.,
    },
    Substrate {
        exchange_id: "EX_gln_L[e]",
        exchange_name: "Extracellular glutamine exchange",
        aerobic_yield: 22.5,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_fru[e]",
        exchange_name: "Extracellular fructose exchange",
        aerobic_yield: 31.,
        anaerobic_yield: 2.,
    },
    Substrate {
        exchange_id: "EX_but[e]",
        exchange_name: "Extracellular butyrate exchange",
        aerobic_yield: 22.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_caproic[e]",
        exchange_name: "Extracellular caproic exchange",
        aerobic_yield: 36.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_octa[e]",
        exchange_name: "Extracellular octanoate exchange",
        aerobic_yield: 50.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_dca[e]",
        exchange_name: "Extracellular decanoate exchange",
        aerobic_yield: 64.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_ddca[e]",
        exchange_name: "Extracellular laureate exchange",
        aerobic_yield: 78.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_ttdca[e]",
        exchange_name: "Extracellular tetradecanoate exchange",
        aerobic_yield: 92.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_hdca[e]",
        exchange_name: "Extracellular hexadecanoate exchange",
        aerobic_yield: 106.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_ocdca[e]",
        exchange_name: "Extracellular octadecanoate exchange",
        aerobic_yield: 120.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_arach[e]",
        exchange_name: "Extracellular arachidate exchange",
        aerobic_yield: 134.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_docosac[e]",
        exchange_name: "Extracellular behenic exchange",
        aerobic_yield: 148.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_lgnc[e]",
        exchange_name: "Extracellular lignocerate exchange",
        aerobic_yield: 162.,
        anaerobic_yield: 0.,
    },
    Substrate {
        exchange_id: "EX_hexc[e]",
        exchange_name: "Extracellular cerotate exchange",
        aerobic_yield: 176.,
        anaerobic_yield: 0.,
    },
];

fn metabolite_id(exchange_id: &str) -> &str {
    exchange_id.strip_prefix("EX_").unwrap_or(exchange_id)
}

/// Look up a carbon source by the id of its exchange reaction
///
/// # Errors
/// [`AtpYieldError::UnknownSubstrate`] if the exchange is not in [`SUBSTRATES`]
pub fn substrate(exchange_id: &str) -> Result<&'static Substrate, AtpYieldError> {
    SUBSTRATES
        .iter()
        .find(|s| s.exchange_id == exchange_id)
        .ok_or_else(|| AtpYieldError::UnknownSubstrate(exchange_id.to_string()))
}

/// Name of a substrate or gas exchange reaction
///
/// # Errors
/// [`AtpYieldError::UnknownSubstrate`] if the exchange is in neither table
pub fn exchange_name(exchange_id: &str) -> Result<&'static str, AtpYieldError> {
    if let Some(gas) = GASES.iter().find(|g| g.exchange_id == exchange_id) {
        return Ok(gas.exchange_name);
    }
    substrate(exchange_id).map(|s| s.exchange_name)
}
