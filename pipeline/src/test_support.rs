//! Shared fixtures for unit tests: a few real Titanic rows.

use std::path::{Path, PathBuf};

/// Train rows with missing Age (ids 6, 18, 20) and Embarked (id 62).
pub const TRAIN_CSV: &str = "\
PassengerId,Survived,Pclass,Name,Sex,Age,SibSp,Parch,Ticket,Fare,Cabin,Embarked
1,0,3,\"Braund, Mr. Owen Harris\",male,22,1,0,A/5 21171,7.25,,S
2,1,1,\"Cumings, Mrs. John Bradley (Florence Briggs Thayer)\",female,38,1,0,PC 17599,71.2833,C85,C
3,1,3,\"Heikkinen, Miss. Laina\",female,26,0,0,STON/O2. 3101282,7.925,,S
4,1,1,\"Futrelle, Mrs. Jacques Heath (Lily May Peel)\",female,35,1,0,113803,53.1,C123,S
5,0,3,\"Allen, Mr. William Henry\",male,35,0,0,373450,8.05,,S
6,0,3,\"Moran, Mr. James\",male,,0,0,330877,8.4583,,Q
7,0,1,\"McCarthy, Mr. Timothy J\",male,54,0,0,17463,51.8625,E46,S
8,0,3,\"Palsson, Master. Gosta Leonard\",male,2,3,1,349909,21.075,,S
9,1,3,\"Johnson, Mrs. Oscar W (Elisabeth Vilhelmina Berg)\",female,27,0,2,347742,11.1333,,S
10,1,2,\"Nasser, Mrs. Nicholas (Adele Achem)\",female,14,1,0,237736,30.0708,,C
11,1,3,\"Sandstrom, Miss. Marguerite Rut\",female,4,1,1,PP 9549,16.7,G6,S
12,1,1,\"Bonnell, Miss. Elizabeth\",female,58,0,0,113783,26.55,C103,S
13,0,3,\"Saundercock, Mr. William Henry\",male,20,0,0,A/5. 2151,8.05,,S
14,0,3,\"Andersson, Mr. Anders Johan\",male,39,1,5,347082,31.275,,S
18,1,2,\"Williams, Mr. Charles Eugene\",male,,0,0,244373,13,,S
20,1,3,\"Masselmani, Mrs. Fatima\",female,,0,0,2649,7.225,,C
62,1,1,\"Icard, Miss. Amelie\",female,38,0,0,113572,80,B28,
17,0,3,\"Rice, Master. Eugene\",male,2,4,1,382652,29.125,,Q
";

/// Test rows with missing Age (ids 902, 914) and Fare (id 1044).
pub const TEST_CSV: &str = "\
PassengerId,Pclass,Name,Sex,Age,SibSp,Parch,Ticket,Fare,Cabin,Embarked
892,3,\"Kelly, Mr. James\",male,34.5,0,0,330911,7.8292,,Q
893,3,\"Wilkes, Mrs. James (Ellen Needs)\",female,47,1,0,363272,7,,S
894,2,\"Myles, Mr. Thomas Francis\",male,62,0,0,240276,9.6875,,Q
895,3,\"Wirz, Mr. Albert\",male,27,0,0,315154,8.6625,,S
896,3,\"Hirvonen, Mrs. Alexander (Helga E Lindqvist)\",female,22,1,1,3101298,12.2875,,S
902,3,\"Ilieff, Mr. Ylio\",male,,0,0,349220,7.8958,,S
914,1,\"Flegenheim, Mrs. Alfred (Antoinette)\",female,,0,0,PC 17598,31.6833,,S
1044,3,\"Storey, Mr. Thomas\",male,60.5,0,0,3701,,,S
";

pub const TRAIN_ROWS: usize = 18;
pub const TEST_ROWS: usize = 8;

/// Write the fixture pair into `dir`.
pub fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
    let train = dir.join("train.csv");
    let test = dir.join("test.csv");
    std::fs::write(&train, TRAIN_CSV).unwrap();
    std::fs::write(&test, TEST_CSV).unwrap();
    (train, test)
}
