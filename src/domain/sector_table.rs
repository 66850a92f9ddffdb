//! Built-in symbol to sector classification.
//!
//! Sectors are listed in lookup order. A symbol present under more than one
//! sector resolves to the first one listed.

use crate::domain::sector::Sector;

pub const DEFAULT_SECTOR_TABLE: &[(Sector, &[&str])] = &[
    (
        Sector::Technology,
        &[
            "AAPL", "MSFT", "GOOGL", "GOOG", "META", "AMZN", "NVDA", "AMD", "INTC", "CSCO", "ORCL",
            "IBM", "ADBE", "CRM", "AVGO", "TXN", "QCOM", "AMAT", "MU", "LRCX", "NOW", "INTU",
            "PYPL", "NFLX", "TWTR", "SNAP", "PINS", "SPOT", "ZM", "TEAM", "WDAY", "SPLK", "DDOG",
        ],
    ),
    (
        Sector::Financials,
        &[
            "JPM", "BAC", "WFC", "C", "GS", "MS", "AXP", "V", "MA", "BLK", "SCHW", "PNC", "USB",
            "TFC", "COF", "SPGI", "MCO", "ICE", "CME", "CB", "MMC", "PGR", "TRV", "ALL", "AIG",
            "MET", "PRU", "BK", "STT", "TROW", "NTRS", "AMP", "DFS", "FITB", "RF", "KEY", "CFG",
        ],
    ),
    (
        Sector::Healthcare,
        &[
            "JNJ", "PFE", "MRK", "ABBV", "ABT", "UNH", "CVS", "AMGN", "MDT", "GILD", "ISRG",
            "ELV", "LLY", "BMY", "TMO", "DHR", "SYK", "ZTS", "REGN", "VRTX", "MRNA", "BIIB",
            "IDXX", "BSX", "BDX", "A", "BAX", "CI", "HUM", "CNC", "ANTM", "ILMN", "IQV", "DXCM",
            "ALGN", "RMD", "MTD", "WAT",
        ],
    ),
    (
        Sector::Energy,
        &[
            "XOM", "CVX", "COP", "EOG", "SLB", "PXD", "OXY", "PSX", "VLO", "MPC", "KMI", "WMB",
            "OKE", "DVN", "HAL", "BKR", "MRO", "APA", "HES", "FANG", "CTRA", "EQT", "LNG", "CVI",
            "TRGP", "PDCE", "SM", "CHK", "AR", "RRC",
        ],
    ),
    (
        Sector::Industrials,
        &[
            "GE", "HON", "MMM", "CAT", "DE", "BA", "LMT", "RTX", "UPS", "FDX", "UNP", "CSX", "NSC",
            "LHX", "GD", "EMR", "ETN", "ITW", "CMI", "PH", "ROK", "IR", "TT", "CARR", "OTIS",
            "PCAR", "URI", "FAST", "GWW", "SWK", "CTAS", "RSG", "WM", "JCI", "AME", "TDG", "CPRT",
            "DAL", "UAL", "LUV",
        ],
    ),
    (
        Sector::ConsumerDiscretionary,
        &[
            "AMZN", "TSLA", "HD", "MCD", "NKE", "SBUX", "TGT", "LOW", "BKNG", "MAR", "DIS",
            "CMCSA", "NFLX", "TJX", "EBAY", "BBY", "DG", "DLTR", "ROST", "ORLY", "AZO", "ULTA",
            "LVS", "MGM", "WYNN", "RCL", "CCL", "HLT", "F", "GM", "TSCO", "DPZ", "YUM", "QSR",
            "DRI", "CMG", "APTV", "EXPE", "ETSY", "LULU",
        ],
    ),
    (
        Sector::ConsumerStaples,
        &[
            "PG", "KO", "PEP", "WMT", "COST", "PM", "MO", "EL", "CL", "KMB", "GIS", "K", "SYY",
            "ADM", "KHC", "STZ", "MDLZ", "HSY", "KR", "CLX", "CAG", "CPB", "HRL", "SJM", "TAP",
            "BG", "MNST", "COTY", "CHD", "MKC", "TSN", "LW",
        ],
    ),
    (
        Sector::Materials,
        &[
            "LIN", "APD", "SHW", "FCX", "NEM", "ECL", "DD", "DOW", "PPG", "NUE", "CTVA", "VMC",
            "MLM", "ALB", "FMC", "IFF", "EMN", "CF", "MOS", "IP", "PKG", "SEE", "AVY", "BLL",
            "AMCR", "WRK", "CE", "GOLD", "AA", "X", "CLF", "MT",
        ],
    ),
    (
        Sector::Utilities,
        &[
            "NEE", "DUK", "SO", "D", "AEP", "EXC", "SRE", "PCG", "XEL", "ED", "ES", "WEC", "PEG",
            "DTE", "AEE", "CMS", "ETR", "FE", "LNT", "EVRG", "AES", "CNP", "NI", "PPL", "AWK",
            "CEG", "EIX", "PNW", "ATO", "NRG", "OGE", "POR", "NWE", "SR", "AVA",
        ],
    ),
    (
        Sector::RealEstate,
        &[
            "AMT", "PLD", "CCI", "EQIX", "PSA", "O", "DLR", "WELL", "SBAC", "AVB", "EQR", "SPG",
            "VICI", "VTR", "ESS", "ARE", "INVH", "UDR", "EXR", "MAA", "KIM", "REG", "FRT", "BXP",
            "HST", "VNO", "CPT", "PEAK", "IRM", "SLG", "AIV", "DEI",
        ],
    ),
    (
        Sector::CommunicationServices,
        &[
            "GOOGL", "GOOG", "META", "NFLX", "DIS", "CMCSA", "VZ", "T", "TMUS", "CHTR", "ATVI",
            "EA", "TTWO", "OMC", "IPG", "LYV", "PARA", "FOXA", "FOX", "DISH", "LUMN", "WBD",
            "NWSA", "NWS", "TWTR", "SNAP", "PINS", "MTCH", "SPOT", "ZM", "RBLX",
        ],
    ),
];
